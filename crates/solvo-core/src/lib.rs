//! Core library for Spanish financial-statement analysis.
//!
//! This crate provides:
//! - Text sources: plain text, native PDF text, OCR fallback for scans
//! - Statement field location with Spanish numerals ("1.234.567,89")
//! - Liquidity and solvency ratios on exact decimals
//! - A per-document pipeline that isolates failures within a batch

pub mod error;
pub mod models;
pub mod pdf;
#[cfg(feature = "ocr")]
pub mod ocr;
pub mod pipeline;
pub mod ratios;
pub mod source;
pub mod statement;

pub use error::{Result, SolvoError};
pub use models::config::SolvoConfig;
pub use pipeline::{DocumentOutcome, DocumentPipeline, DocumentReport, FailureKind};
pub use ratios::{compute_ratios, RatioCalculator, RatioSet, Rounding};
pub use source::{Document, DocumentKind, FallbackTextSource, PdfTextSource, PlainTextSource, TextSource};
#[cfg(feature = "ocr")]
pub use source::OcrTextSource;
pub use statement::{locate_fields, FieldKey, FieldLocator, FieldSet, FieldTable, StatementExtractor};
