//! Error types for the solvo-core library.

use thiserror::Error;

use crate::statement::FieldKey;

/// Main error type for the solvo library.
///
/// Per-document failures travel as [`SourceError`], [`ExtractionError`] and
/// [`RatioError`] inside a report; this type covers setup.
#[derive(Error, Debug)]
pub enum SolvoError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Nothing to recognize in the document.
    #[error("no page images found")]
    NoImages,
}

/// Errors raised while producing text for a document.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Neither native extraction nor OCR produced usable text.
    #[error("no usable text: {0}")]
    Unavailable(String),
}

/// Errors related to statement field extraction.
///
/// Neither variant carries partially extracted data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A required field was not found in the text.
    #[error("missing required field: {field}")]
    Incomplete { field: FieldKey },

    /// A field label was found but its value is not a valid numeral.
    #[error("invalid numeral for {field}: {value:?}")]
    NumeralMalformed { field: FieldKey, value: String },
}

/// Failure to parse a locale-formatted numeral.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed numeral {raw:?}: {reason}")]
pub struct NumeralError {
    pub raw: String,
    pub reason: &'static str,
}

/// Errors related to ratio computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatioError {
    /// The ratio has no defined value for these inputs.
    #[error("{ratio} is undefined: {reason}")]
    Undefined { ratio: &'static str, reason: String },
}

/// Result type for the solvo library.
pub type Result<T> = std::result::Result<T, SolvoError>;
