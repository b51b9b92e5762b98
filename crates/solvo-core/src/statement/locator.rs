//! Field locator mapping statement text to a complete field set.

use std::time::Instant;

use tracing::{debug, info, trace};

use super::fields::{FieldDefinition, FieldSet, FieldTable, DEFAULT_FIELDS};
use super::rules::numeral::{NumeralNormalizer, SpanishNumerals};
use super::{Result, StatementExtractor};
use crate::error::ExtractionError;

/// The raw numeral found for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedField {
    /// Field the span belongs to.
    pub key: super::FieldKey,
    /// Index of the winning label pattern.
    pub pattern_index: usize,
    /// Numeral substring, before normalization.
    pub raw: String,
    /// Byte offsets of the numeral in the text.
    pub start: usize,
    pub end: usize,
}

enum Lookup {
    Found(LocatedField),
    /// Label present, but followed by this non-numeral token.
    NotNumeral(String),
    Absent,
}

fn lookup(text: &str, definition: &FieldDefinition) -> Lookup {
    for (index, label) in definition.labels().iter().enumerate() {
        if let Some(m) = label.value.captures(text).and_then(|caps| caps.get(1)) {
            return Lookup::Found(LocatedField {
                key: definition.key,
                pattern_index: index,
                raw: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
        trace!("{}: pattern {} did not match", definition.key, index);
    }

    definition
        .labels()
        .iter()
        .find_map(|label| label.any.captures(text))
        .map(|caps| Lookup::NotNumeral(caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default()))
        .unwrap_or(Lookup::Absent)
}

/// Locate every field of `table` in `text` using the Spanish numeral convention.
///
/// Returns the complete field set or the first failure in table order. A
/// partial set is never returned.
pub fn locate_fields(text: &str, table: &FieldTable) -> Result<FieldSet> {
    locate_fields_with(text, table, &SpanishNumerals)
}

/// Same as [`locate_fields`] with an explicit numeral convention.
pub fn locate_fields_with<N: NumeralNormalizer + ?Sized>(
    text: &str,
    table: &FieldTable,
    normalizer: &N,
) -> Result<FieldSet> {
    let mut located = Vec::with_capacity(table.len());

    for definition in table.iter() {
        match lookup(text, definition) {
            Lookup::Found(field) => {
                debug!(
                    "{} = {:?} (pattern {}, bytes {}..{})",
                    field.key, field.raw, field.pattern_index, field.start, field.end
                );
                located.push(field);
            }
            Lookup::NotNumeral(value) if definition.required => {
                debug!("{} label found without a numeral: {:?}", definition.key, value);
                return Err(ExtractionError::NumeralMalformed {
                    field: definition.key,
                    value,
                });
            }
            // A bare section header for an optional field counts as absent
            Lookup::NotNumeral(value) => {
                trace!("optional {} label has no numeral ({:?})", definition.key, value);
            }
            Lookup::Absent if definition.required => {
                debug!("{} not found, abandoning extraction", definition.key);
                return Err(ExtractionError::Incomplete { field: definition.key });
            }
            Lookup::Absent => {
                trace!("optional {} not found", definition.key);
            }
        }
    }

    let mut values = Vec::with_capacity(located.len());
    for field in located {
        let value = normalizer.normalize(&field.raw).map_err(|e| {
            debug!("{}: {}", field.key, e);
            ExtractionError::NumeralMalformed {
                field: field.key,
                value: field.raw.clone(),
            }
        })?;
        values.push((field.key, value));
    }

    FieldSet::from_values(values, table)
}

/// Spans of every field that has a numeral match, without normalizing.
pub fn locate_spans(text: &str, table: &FieldTable) -> Vec<LocatedField> {
    table
        .iter()
        .filter_map(|definition| match lookup(text, definition) {
            Lookup::Found(field) => Some(field),
            _ => None,
        })
        .collect()
}

/// Statement field locator bound to a field table and a numeral convention.
#[derive(Debug, Clone)]
pub struct FieldLocator<N = SpanishNumerals> {
    table: FieldTable,
    normalizer: N,
}

impl FieldLocator<SpanishNumerals> {
    /// Create a locator over the built-in field table.
    pub fn new() -> Self {
        Self {
            table: DEFAULT_FIELDS.clone(),
            normalizer: SpanishNumerals,
        }
    }
}

impl Default for FieldLocator<SpanishNumerals> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NumeralNormalizer> FieldLocator<N> {
    /// Replace the field table.
    pub fn with_table(mut self, table: FieldTable) -> Self {
        self.table = table;
        self
    }

    /// Swap the numeral convention.
    pub fn with_normalizer<M: NumeralNormalizer>(self, normalizer: M) -> FieldLocator<M> {
        FieldLocator {
            table: self.table,
            normalizer,
        }
    }

    pub fn table(&self) -> &FieldTable {
        &self.table
    }

    /// Locate the complete field set.
    pub fn locate(&self, text: &str) -> Result<FieldSet> {
        locate_fields_with(text, &self.table, &self.normalizer)
    }

    /// Located spans, for diagnostics.
    pub fn spans(&self, text: &str) -> Vec<LocatedField> {
        locate_spans(text, &self.table)
    }
}

impl<N: NumeralNormalizer> StatementExtractor for FieldLocator<N> {
    fn extract(&self, text: &str) -> Result<FieldSet> {
        let start = Instant::now();
        info!("Locating statement fields in {} characters of text", text.len());

        let result = self.locate(text);
        match &result {
            Ok(fields) => debug!("Located {} fields in {:?}", fields.len(), start.elapsed()),
            Err(e) => debug!("Extraction failed after {:?}: {}", start.elapsed(), e),
        }
        result
    }
}
