//! Liquidity and solvency ratios computed from an extracted field set.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::RatioError;
use crate::statement::{FieldKey, FieldSet};

/// Result type for ratio computation.
pub type Result<T> = std::result::Result<T, RatioError>;

/// Fraction digits every ratio is quantized to.
pub const RATIO_SCALE: u32 = 2;

/// Midpoint rule used when quantizing ratios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// 0.005 -> 0.01, -0.005 -> -0.01.
    #[default]
    HalfAwayFromZero,
    /// Banker's rounding: 0.005 -> 0.00, 0.015 -> 0.02.
    HalfEven,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::HalfAwayFromZero => RoundingStrategy::MidpointAwayFromZero,
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }

    /// Round to exactly [`RATIO_SCALE`] fraction digits.
    pub fn quantize(self, value: Decimal) -> Decimal {
        let mut rounded = value.round_dp_with_strategy(RATIO_SCALE, self.strategy());
        rounded.rescale(RATIO_SCALE);
        rounded
    }
}

/// Ratios and flags derived from one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioSet {
    /// Current assets / current liabilities.
    pub liquidity: Decimal,
    /// (Cash - (current + non-current liabilities)) / risk.
    pub cash_net_debt_to_risk: Decimal,
    /// Net equity / risk.
    pub equity_to_risk: Decimal,
    /// Net equity / (current + non-current assets).
    pub equity_to_total_assets: Decimal,
    /// Non-current assets were absent and counted as zero.
    pub total_assets_approximated: bool,
    /// Short-term group investments exceed half of current assets.
    pub group_investments_over_half_current_assets: bool,
    /// Inventory exceeds half of current assets.
    pub inventory_over_half_current_assets: bool,
}

/// Computes [`RatioSet`]s with a fixed rounding rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioCalculator {
    rounding: Rounding,
}

impl RatioCalculator {
    pub fn new(rounding: Rounding) -> Self {
        Self { rounding }
    }

    /// activo_corriente / pasivo_corriente
    pub fn liquidity(&self, fields: &FieldSet) -> Result<Decimal> {
        const RATIO: &str = "liquidity";
        let current_assets = require(fields, FieldKey::ActivoCorriente, RATIO)?;
        let current_liabilities = require(fields, FieldKey::PasivoCorriente, RATIO)?;
        self.divide(RATIO, current_assets, current_liabilities, FieldKey::PasivoCorriente.as_str())
    }

    /// (efectivo_liquido - (pasivo_corriente + pasivo_no_corriente)) / riesgo
    pub fn cash_net_debt_to_risk(&self, fields: &FieldSet) -> Result<Decimal> {
        const RATIO: &str = "cash_net_debt_to_risk";
        let cash = require(fields, FieldKey::EfectivoLiquido, RATIO)?;
        let current_liabilities = require(fields, FieldKey::PasivoCorriente, RATIO)?;
        let non_current_liabilities = require(fields, FieldKey::PasivoNoCorriente, RATIO)?;
        let risk = require(fields, FieldKey::Riesgo, RATIO)?;

        let net_debt = current_liabilities
            .checked_add(non_current_liabilities)
            .ok_or_else(|| out_of_range(RATIO))?;
        let numerator = cash.checked_sub(net_debt).ok_or_else(|| out_of_range(RATIO))?;
        self.divide(RATIO, numerator, risk, FieldKey::Riesgo.as_str())
    }

    /// patrimonio_neto / riesgo
    pub fn equity_to_risk(&self, fields: &FieldSet) -> Result<Decimal> {
        const RATIO: &str = "equity_to_risk";
        let equity = require(fields, FieldKey::PatrimonioNeto, RATIO)?;
        let risk = require(fields, FieldKey::Riesgo, RATIO)?;
        self.divide(RATIO, equity, risk, FieldKey::Riesgo.as_str())
    }

    /// patrimonio_neto / (activo_corriente + activo_no_corriente), with the
    /// flag set when non-current assets fell back to zero.
    pub fn equity_to_total_assets(&self, fields: &FieldSet) -> Result<(Decimal, bool)> {
        const RATIO: &str = "equity_to_total_assets";
        let equity = require(fields, FieldKey::PatrimonioNeto, RATIO)?;
        let current_assets = require(fields, FieldKey::ActivoCorriente, RATIO)?;
        let (non_current_assets, approximated) = fields.non_current_assets();

        let total_assets = current_assets
            .checked_add(non_current_assets)
            .ok_or_else(|| out_of_range(RATIO))?;
        let what = if approximated {
            "total assets (non-current assets absent)"
        } else {
            "total assets"
        };
        let ratio = self.divide(RATIO, equity, total_assets, what)?;
        Ok((ratio, approximated))
    }

    /// Compute every ratio and flag, failing on the first undefined ratio.
    pub fn compute(&self, fields: &FieldSet) -> Result<RatioSet> {
        let liquidity = self.liquidity(fields)?;
        let cash_net_debt_to_risk = self.cash_net_debt_to_risk(fields)?;
        let equity_to_risk = self.equity_to_risk(fields)?;
        let (equity_to_total_assets, total_assets_approximated) =
            self.equity_to_total_assets(fields)?;

        let current_assets = require(fields, FieldKey::ActivoCorriente, "flags")?;
        let half_current_assets = current_assets * Decimal::new(5, 1);
        let group_investments = require(fields, FieldKey::InversionesCp, "flags")?;
        let inventory = require(fields, FieldKey::Existencias, "flags")?;

        Ok(RatioSet {
            liquidity,
            cash_net_debt_to_risk,
            equity_to_risk,
            equity_to_total_assets,
            total_assets_approximated,
            group_investments_over_half_current_assets: group_investments > half_current_assets,
            inventory_over_half_current_assets: inventory > half_current_assets,
        })
    }

    fn divide(
        &self,
        ratio: &'static str,
        numerator: Decimal,
        denominator: Decimal,
        what: &str,
    ) -> Result<Decimal> {
        if denominator.is_zero() {
            return Err(RatioError::Undefined {
                ratio,
                reason: format!("{} is zero", what),
            });
        }
        numerator
            .checked_div(denominator)
            .map(|value| self.rounding.quantize(value))
            .ok_or_else(|| out_of_range(ratio))
    }
}

/// Compute every ratio with the given rounding rule.
pub fn compute_ratios(fields: &FieldSet, rounding: Rounding) -> Result<RatioSet> {
    RatioCalculator::new(rounding).compute(fields)
}

fn require(fields: &FieldSet, key: FieldKey, ratio: &'static str) -> Result<Decimal> {
    fields.get(key).ok_or_else(|| RatioError::Undefined {
        ratio,
        reason: format!("{} is missing", key),
    })
}

fn out_of_range(ratio: &'static str) -> RatioError {
    RatioError::Undefined {
        ratio,
        reason: "result out of range".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::DEFAULT_FIELDS;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fields(overrides: &[(FieldKey, &str)]) -> FieldSet {
        let mut values: Vec<(FieldKey, Decimal)> = vec![
            (FieldKey::ActivoCorriente, dec("1000000")),
            (FieldKey::PasivoCorriente, dec("400000")),
            (FieldKey::PasivoNoCorriente, dec("100000")),
            (FieldKey::EfectivoLiquido, dec("800000")),
            (FieldKey::PatrimonioNeto, dec("750000")),
            (FieldKey::FondosPropios, dec("700000")),
            (FieldKey::ResultadoAntesImp, dec("-5000")),
            (FieldKey::Existencias, dec("500000")),
            (FieldKey::InversionesCp, dec("500000.01")),
            (FieldKey::Riesgo, dec("300000")),
        ];
        for (key, value) in overrides {
            values.retain(|(k, _)| k != key);
            values.push((*key, dec(value)));
        }
        FieldSet::from_values(values, &DEFAULT_FIELDS).unwrap()
    }

    #[test]
    fn test_compute_ratios() {
        let ratios = compute_ratios(&fields(&[]), Rounding::default()).unwrap();

        assert_eq!(ratios.liquidity.to_string(), "2.50");
        assert_eq!(ratios.cash_net_debt_to_risk.to_string(), "1.00");
        assert_eq!(ratios.equity_to_risk.to_string(), "2.50");
        assert_eq!(ratios.equity_to_total_assets.to_string(), "0.75");
        assert!(ratios.total_assets_approximated);
        assert!(ratios.group_investments_over_half_current_assets);
        // exactly half is not "over" half
        assert!(!ratios.inventory_over_half_current_assets);
    }

    #[test]
    fn test_non_current_assets_are_used_when_present() {
        let set = fields(&[(FieldKey::ActivoNoCorriente, "2000000")]);
        let ratios = compute_ratios(&set, Rounding::default()).unwrap();
        assert_eq!(ratios.equity_to_total_assets, dec("0.25"));
        assert!(!ratios.total_assets_approximated);
    }

    #[test]
    fn test_zero_current_liabilities_is_undefined() {
        let set = fields(&[
            (FieldKey::PasivoCorriente, "0.00"),
            (FieldKey::ActivoCorriente, "500000.00"),
        ]);
        let err = RatioCalculator::default().liquidity(&set).unwrap_err();
        assert_eq!(
            err,
            RatioError::Undefined {
                ratio: "liquidity",
                reason: "pasivo_corriente is zero".to_string(),
            }
        );
        assert!(compute_ratios(&set, Rounding::default()).is_err());
    }

    #[test]
    fn test_zero_risk_is_undefined() {
        let set = fields(&[(FieldKey::Riesgo, "0")]);
        assert!(matches!(
            RatioCalculator::default().equity_to_risk(&set),
            Err(RatioError::Undefined { ratio: "equity_to_risk", .. })
        ));
    }

    #[test]
    fn test_zero_total_assets_is_undefined() {
        let set = fields(&[(FieldKey::ActivoCorriente, "0")]);
        let err = RatioCalculator::default().equity_to_total_assets(&set).unwrap_err();
        assert!(err.to_string().contains("non-current assets absent"));
    }

    #[test]
    fn test_quantize_always_two_digits() {
        assert_eq!(Rounding::HalfAwayFromZero.quantize(dec("3")).to_string(), "3.00");
        assert_eq!(Rounding::HalfAwayFromZero.quantize(dec("1.5")).to_string(), "1.50");
        assert_eq!(Rounding::HalfAwayFromZero.quantize(dec("0.3333333")).to_string(), "0.33");
    }

    #[test]
    fn test_midpoint_rules() {
        assert_eq!(Rounding::HalfAwayFromZero.quantize(dec("0.005")), dec("0.01"));
        assert_eq!(Rounding::HalfAwayFromZero.quantize(dec("-0.005")), dec("-0.01"));
        assert_eq!(Rounding::HalfAwayFromZero.quantize(dec("0.015")), dec("0.02"));
        assert_eq!(Rounding::HalfEven.quantize(dec("0.005")), dec("0.00"));
        assert_eq!(Rounding::HalfEven.quantize(dec("0.015")), dec("0.02"));
        assert_eq!(Rounding::HalfEven.quantize(dec("0.025")), dec("0.02"));
    }

    #[test]
    fn test_ratios_serialize_as_two_digit_strings() {
        let set = fields(&[(FieldKey::PasivoCorriente, "300000")]);
        let ratios = compute_ratios(&set, Rounding::default()).unwrap();
        let json = serde_json::to_value(&ratios).unwrap();
        assert_eq!(json["liquidity"], "3.33");
        assert_eq!(json["total_assets_approximated"], true);
    }
}
