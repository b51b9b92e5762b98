//! Numeral normalization for Spanish-formatted statement amounts.

use rust_decimal::Decimal;

use super::patterns::ES_NUMERAL_SHAPE;
use crate::error::NumeralError;

/// Converts locale-formatted numerals into exact decimals and back.
pub trait NumeralNormalizer {
    /// Parse a numeral substring.
    fn normalize(&self, raw: &str) -> Result<Decimal, NumeralError>;

    /// Render a value in the same convention `normalize` accepts.
    fn format(&self, value: Decimal) -> String;
}

/// Period groups thousands, comma separates the fraction: `1.234.567,89`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanishNumerals;

impl NumeralNormalizer for SpanishNumerals {
    fn normalize(&self, raw: &str) -> Result<Decimal, NumeralError> {
        parse_spanish_amount(raw)
    }

    fn format(&self, value: Decimal) -> String {
        format_spanish_amount(value)
    }
}

/// Parse a Spanish-formatted amount (e.g., "1.234.567,89" or "-500,5").
pub fn parse_spanish_amount(raw: &str) -> Result<Decimal, NumeralError> {
    let malformed = |reason| NumeralError {
        raw: raw.to_string(),
        reason,
    };

    let compact: String = raw.trim().chars().filter(|c| *c != '.').collect();

    if !ES_NUMERAL_SHAPE.is_match(&compact) {
        return Err(malformed("unexpected characters or separators"));
    }
    if !compact.chars().any(|c| c.is_ascii_digit()) {
        return Err(malformed("no digits"));
    }

    let (negative, body) = match compact.as_bytes()[0] {
        b'-' => (true, &compact[1..]),
        b'+' => (false, &compact[1..]),
        _ => (false, compact.as_str()),
    };

    let (integer_part, fraction_part) = body.split_once(',').unwrap_or((body, ""));
    let integer_part = if integer_part.is_empty() { "0" } else { integer_part };

    let mut literal = String::with_capacity(body.len() + 2);
    if negative {
        literal.push('-');
    }
    literal.push_str(integer_part);
    if !fraction_part.is_empty() {
        literal.push('.');
        literal.push_str(fraction_part);
    }

    Decimal::from_str_exact(&literal).map_err(|_| malformed("out of range"))
}

/// Format amount in Spanish style (1.234.567,89), keeping the value's scale.
pub fn format_spanish_amount(amount: Decimal) -> String {
    let plain = amount.abs().to_string();
    let (integer_part, fraction_part) = plain.split_once('.').unwrap_or((plain.as_str(), ""));

    // Add thousand separators
    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    if amount.is_sign_negative() && !amount.is_zero() {
        formatted.push('-');
    }
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    if !fraction_part.is_empty() {
        formatted.push(',');
        formatted.push_str(fraction_part);
    }

    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_spanish_amount() {
        assert_eq!(parse_spanish_amount("1.234.567,89"), Ok(dec("1234567.89")));
        assert_eq!(parse_spanish_amount("  500.000,00 "), Ok(dec("500000.00")));
        assert_eq!(parse_spanish_amount("17.850"), Ok(dec("17850")));
        assert_eq!(parse_spanish_amount("0,00"), Ok(Decimal::ZERO));
        assert_eq!(parse_spanish_amount("-12.000,5"), Ok(dec("-12000.5")));
        assert_eq!(parse_spanish_amount("+3,25"), Ok(dec("3.25")));
        assert_eq!(parse_spanish_amount(",5"), Ok(dec("0.5")));
    }

    #[test]
    fn test_parse_keeps_exact_scale() {
        let value = parse_spanish_amount("1.000,10").unwrap();
        assert_eq!(value.scale(), 2);
        assert_eq!(value.to_string(), "1000.10");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in ["", "   ", ".", "1,2,3", "N/A", "12a", "-", "+,", "1 000,00", "--5"] {
            assert!(parse_spanish_amount(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let err = parse_spanish_amount("999.999.999.999.999.999.999.999.999.999.999").unwrap_err();
        assert_eq!(err.reason, "out of range");
    }

    #[test]
    fn test_format_spanish_amount() {
        assert_eq!(format_spanish_amount(dec("1234567.89")), "1.234.567,89");
        assert_eq!(format_spanish_amount(dec("999.5")), "999,5");
        assert_eq!(format_spanish_amount(dec("1000")), "1.000");
        assert_eq!(format_spanish_amount(dec("-45000.00")), "-45.000,00");
        assert_eq!(format_spanish_amount(dec("0.07")), "0,07");
    }

    #[test]
    fn test_format_then_normalize_is_identity() {
        let normalizer = SpanishNumerals;
        let samples = [
            "0", "0.01", "7", "12.3", "999.99", "1000", "1000.5", "123456.78",
            "-0.99", "-1000000", "-987654321.12", "79228162514264337593543950.33",
        ];
        for s in samples {
            let value = dec(s);
            let formatted = normalizer.format(value);
            assert_eq!(normalizer.normalize(&formatted), Ok(value), "via {formatted:?}");
        }
    }
}
