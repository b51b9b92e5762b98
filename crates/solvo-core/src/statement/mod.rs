//! Statement field extraction.

mod fields;
mod locator;
pub mod rules;

pub use fields::{
    CompiledLabel, FieldDefinition, FieldKey, FieldSet, FieldTable, LabelPattern, DEFAULT_FIELDS,
};
pub use locator::{locate_fields, locate_fields_with, locate_spans, FieldLocator, LocatedField};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for statement field extractors.
pub trait StatementExtractor {
    /// Extract the complete field set from plain text.
    fn extract(&self, text: &str) -> Result<FieldSet>;
}
