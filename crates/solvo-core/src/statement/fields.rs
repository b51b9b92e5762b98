//! Field definitions and the extracted field set.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rules::patterns::{labeled, ANY_TOKEN, LAZY_SEPARATOR, NUMERAL, SEPARATOR, SIGNED_NUMERAL};
use crate::error::{ExtractionError, SolvoError};

/// Financial quantities located in a statement.
///
/// Declaration order is the enumeration order used by the locator and the
/// serialization order of a [`FieldSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    ActivoCorriente,
    PasivoCorriente,
    PasivoNoCorriente,
    EfectivoLiquido,
    PatrimonioNeto,
    FondosPropios,
    ResultadoAntesImp,
    Existencias,
    InversionesCp,
    Riesgo,
    ActivoNoCorriente,
}

impl FieldKey {
    /// Every key, in enumeration order.
    pub const ALL: [FieldKey; 11] = [
        FieldKey::ActivoCorriente,
        FieldKey::PasivoCorriente,
        FieldKey::PasivoNoCorriente,
        FieldKey::EfectivoLiquido,
        FieldKey::PatrimonioNeto,
        FieldKey::FondosPropios,
        FieldKey::ResultadoAntesImp,
        FieldKey::Existencias,
        FieldKey::InversionesCp,
        FieldKey::Riesgo,
        FieldKey::ActivoNoCorriente,
    ];

    /// Stable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::ActivoCorriente => "activo_corriente",
            FieldKey::PasivoCorriente => "pasivo_corriente",
            FieldKey::PasivoNoCorriente => "pasivo_no_corriente",
            FieldKey::EfectivoLiquido => "efectivo_liquido",
            FieldKey::PatrimonioNeto => "patrimonio_neto",
            FieldKey::FondosPropios => "fondos_propios",
            FieldKey::ResultadoAntesImp => "resultado_antes_imp",
            FieldKey::Existencias => "existencias",
            FieldKey::InversionesCp => "inversiones_cp",
            FieldKey::Riesgo => "riesgo",
            FieldKey::ActivoNoCorriente => "activo_no_corriente",
        }
    }
}

impl FromStr for FieldKey {
    type Err = SolvoError;

    /// Parse a stable identifier, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SolvoError::Config(format!("unknown field: {s:?}")))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A textual label that may precede a field's numeral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPattern {
    /// Literal words; any run of whitespace may separate them.
    Phrase(String),
    /// Regex fragment, matched case-insensitively.
    Raw(String),
}

impl LabelPattern {
    pub fn phrase(words: impl Into<String>) -> Self {
        Self::Phrase(words.into())
    }

    pub fn raw(pattern: impl Into<String>) -> Self {
        Self::Raw(pattern.into())
    }

    /// Regex source for the label alone.
    pub fn regex_source(&self) -> String {
        match self {
            LabelPattern::Phrase(words) => words
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+"),
            LabelPattern::Raw(pattern) => pattern.clone(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            LabelPattern::Phrase(words) => words.trim().is_empty(),
            LabelPattern::Raw(pattern) => pattern.is_empty(),
        }
    }
}

/// A label pattern compiled for one field.
#[derive(Debug, Clone)]
pub struct CompiledLabel {
    /// Source pattern.
    pub label: LabelPattern,
    /// Label, separator and numeral token.
    pub(crate) value: Regex,
    /// Label, separator and whatever token follows.
    pub(crate) any: Regex,
}

/// A named financial quantity and the labels that introduce it.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Stable identifier.
    pub key: FieldKey,
    /// Whether the numeral may carry a leading sign.
    pub signed: bool,
    /// Whether a missing value invalidates the whole extraction.
    pub required: bool,
    labels: Vec<CompiledLabel>,
}

impl FieldDefinition {
    /// Compile a definition. Labels are kept in priority order.
    pub fn new(
        key: FieldKey,
        labels: Vec<LabelPattern>,
        signed: bool,
        required: bool,
    ) -> Result<Self, SolvoError> {
        let mut definition = Self {
            key,
            signed,
            required,
            labels: Vec::with_capacity(labels.len()),
        };
        for label in labels {
            definition.push_label(label)?;
        }
        Ok(definition)
    }

    fn push_label(&mut self, label: LabelPattern) -> Result<(), SolvoError> {
        if label.is_blank() {
            return Err(SolvoError::Config(format!("empty label for {}", self.key)));
        }

        let key = self.key;
        let source = label.regex_source();
        let (separator, numeral) = if self.signed {
            (LAZY_SEPARATOR, SIGNED_NUMERAL)
        } else {
            (SEPARATOR, NUMERAL)
        };

        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| {
                SolvoError::Config(format!("invalid label {:?} for {}: {}", source, key, e))
            })
        };
        let value = compile(labeled(&source, separator, numeral))?;
        let any = compile(labeled(&source, SEPARATOR, ANY_TOKEN))?;

        self.labels.push(CompiledLabel { label, value, any });
        Ok(())
    }

    /// Compiled labels in priority order.
    pub fn labels(&self) -> &[CompiledLabel] {
        &self.labels
    }
}

/// The fixed, ordered set of field definitions.
#[derive(Debug, Clone)]
pub struct FieldTable {
    definitions: Vec<FieldDefinition>,
}

lazy_static! {
    /// Built-in label table.
    pub static ref DEFAULT_FIELDS: FieldTable = FieldTable::builtin();
}

impl FieldTable {
    /// Build a table from definitions, in enumeration order.
    pub fn new(definitions: Vec<FieldDefinition>) -> Self {
        Self { definitions }
    }

    /// The built-in Spanish statement labels.
    pub fn builtin() -> Self {
        use FieldKey::*;
        use LabelPattern as L;

        let rows: Vec<(FieldKey, Vec<LabelPattern>, bool, bool)> = vec![
            (ActivoCorriente, vec![L::phrase("Activo Corriente")], false, true),
            (PasivoCorriente, vec![L::phrase("Pasivo Corriente")], false, true),
            (PasivoNoCorriente, vec![L::phrase("Pasivo No Corriente")], false, true),
            (EfectivoLiquido, vec![L::raw(r"Efectivo\s+y\s+otros\s+l[ií]quidos")], false, true),
            (PatrimonioNeto, vec![L::phrase("Patrimonio Neto")], false, true),
            (FondosPropios, vec![L::phrase("Fondos Propios")], false, true),
            (ResultadoAntesImp, vec![L::phrase("Resultado antes de impuestos")], true, true),
            (Existencias, vec![L::phrase("Existencias")], false, true),
            (
                InversionesCp,
                vec![
                    // "Inversiones grupo C/P: 123.456,78"
                    L::raw(r"Inversiones.*?C/P"),
                    // "Inversiones en empresas del grupo y asociadas a C/P  17.850,00"
                    L::raw(r"Inversiones.*?grupo.*?C/P"),
                ],
                false,
                true,
            ),
            (Riesgo, vec![L::phrase("Riesgo")], false, true),
            (ActivoNoCorriente, vec![L::phrase("Activo No Corriente")], false, false),
        ];

        let definitions = rows
            .into_iter()
            .map(|(key, labels, signed, required)| {
                FieldDefinition::new(key, labels, signed, required)
                    .expect("built-in label patterns compile")
            })
            .collect();

        Self { definitions }
    }

    /// Append extra phrase labels, at the lowest priority, to the given fields.
    pub fn with_extra_labels(
        mut self,
        extra: &BTreeMap<FieldKey, Vec<String>>,
    ) -> Result<Self, SolvoError> {
        for (key, phrases) in extra {
            let definition = self
                .definitions
                .iter_mut()
                .find(|d| d.key == *key)
                .ok_or_else(|| SolvoError::Config(format!("no definition for {}", key)))?;
            for phrase in phrases {
                definition.push_label(LabelPattern::phrase(phrase.as_str()))?;
            }
        }
        Ok(self)
    }

    /// Definitions in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definitions.iter()
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldDefinition> {
        self.definitions.iter().find(|d| d.key == key)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for FieldTable {
    fn default() -> Self {
        DEFAULT_FIELDS.clone()
    }
}

/// Extracted field values.
///
/// Always holds every required field of the table it was built against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSet {
    values: BTreeMap<FieldKey, Decimal>,
}

impl FieldSet {
    /// Build a field set, failing on the first required field with no value.
    pub fn from_values(
        values: impl IntoIterator<Item = (FieldKey, Decimal)>,
        table: &FieldTable,
    ) -> Result<Self, ExtractionError> {
        let values: BTreeMap<FieldKey, Decimal> = values.into_iter().collect();
        if let Some(missing) = table
            .iter()
            .find(|d| d.required && !values.contains_key(&d.key))
        {
            return Err(ExtractionError::Incomplete { field: missing.key });
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: FieldKey) -> Option<Decimal> {
        self.values.get(&key).copied()
    }

    /// Non-current assets, or zero when the statement did not show them.
    ///
    /// The flag is true when the zero fallback was used.
    pub fn non_current_assets(&self) -> (Decimal, bool) {
        match self.get(FieldKey::ActivoNoCorriente) {
            Some(value) => (value, false),
            None => (Decimal::ZERO, true),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, Decimal)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_order_and_flags() {
        let keys: Vec<FieldKey> = DEFAULT_FIELDS.iter().map(|d| d.key).collect();
        assert_eq!(keys, FieldKey::ALL.to_vec());

        let signed: Vec<FieldKey> = DEFAULT_FIELDS.iter().filter(|d| d.signed).map(|d| d.key).collect();
        assert_eq!(signed, vec![FieldKey::ResultadoAntesImp]);

        let optional: Vec<FieldKey> = DEFAULT_FIELDS.iter().filter(|d| !d.required).map(|d| d.key).collect();
        assert_eq!(optional, vec![FieldKey::ActivoNoCorriente]);
    }

    #[test]
    fn test_field_key_names() {
        assert_eq!(FieldKey::InversionesCp.to_string(), "inversiones_cp");
        assert_eq!(
            " RESULTADO_ANTES_IMP".parse::<FieldKey>().ok(),
            Some(FieldKey::ResultadoAntesImp)
        );
        assert!(matches!("ventas".parse::<FieldKey>(), Err(SolvoError::Config(_))));
        assert_eq!(
            serde_json::to_string(&FieldKey::PasivoNoCorriente).unwrap(),
            "\"pasivo_no_corriente\""
        );
    }

    #[test]
    fn test_phrase_label_is_escaped_and_whitespace_flexible() {
        let label = LabelPattern::phrase("Fondos  Propios (total)");
        assert_eq!(label.regex_source(), r"Fondos\s+Propios\s+\(total\)");
    }

    #[test]
    fn test_extra_labels_append_at_lowest_priority() {
        let mut extra = BTreeMap::new();
        extra.insert(FieldKey::Riesgo, vec!["Exposición total".to_string()]);

        let table = FieldTable::builtin().with_extra_labels(&extra).unwrap();
        let labels = table.get(FieldKey::Riesgo).unwrap().labels();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label, LabelPattern::phrase("Riesgo"));
        assert_eq!(labels[1].label, LabelPattern::phrase("Exposición total"));
    }

    #[test]
    fn test_blank_extra_label_is_rejected() {
        let mut extra = BTreeMap::new();
        extra.insert(FieldKey::Riesgo, vec!["   ".to_string()]);
        assert!(FieldTable::builtin().with_extra_labels(&extra).is_err());
    }

    #[test]
    fn test_field_set_requires_every_required_field() {
        let partial = vec![(FieldKey::ActivoCorriente, Decimal::ONE)];
        assert_eq!(
            FieldSet::from_values(partial, &DEFAULT_FIELDS),
            Err(ExtractionError::Incomplete { field: FieldKey::PasivoCorriente })
        );
    }

    #[test]
    fn test_non_current_assets_fallback_is_flagged() {
        let values = FieldKey::ALL
            .into_iter()
            .filter(|k| *k != FieldKey::ActivoNoCorriente)
            .map(|k| (k, Decimal::ONE));
        let fields = FieldSet::from_values(values, &DEFAULT_FIELDS).unwrap();
        assert_eq!(fields.non_current_assets(), (Decimal::ZERO, true));
        assert_eq!(fields.len(), 10);
    }
}
