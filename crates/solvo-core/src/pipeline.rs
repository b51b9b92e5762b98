//! Per-document pipeline: text source, field locator, ratios.
//!
//! Every document ends in a [`DocumentReport`]. A failing document never
//! stops the rest of a batch.

use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ExtractionError, SolvoError, SourceError};
use crate::models::config::SolvoConfig;
use crate::ratios::{RatioCalculator, RatioSet, Rounding};
use crate::source::{self, Document, TextSource};
use crate::statement::{FieldLocator, FieldSet, FieldTable, StatementExtractor};

/// Why a document produced no ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceUnavailable,
    ExtractionIncomplete,
    NumeralMalformed,
    RatioUndefined,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SourceUnavailable => "source_unavailable",
            FailureKind::ExtractionIncomplete => "extraction_incomplete",
            FailureKind::NumeralMalformed => "numeral_malformed",
            FailureKind::RatioUndefined => "ratio_undefined",
        }
    }
}

impl From<&ExtractionError> for FailureKind {
    fn from(error: &ExtractionError) -> Self {
        match error {
            ExtractionError::Incomplete { .. } => FailureKind::ExtractionIncomplete,
            ExtractionError::NumeralMalformed { .. } => FailureKind::NumeralMalformed,
        }
    }
}

/// Result for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub filename: String,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Success {
        size_kb: Decimal,
        fields: FieldSet,
        ratios: RatioSet,
    },
    Failure {
        kind: FailureKind,
        error: String,
        /// Only present when extraction succeeded but a ratio was undefined.
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<FieldSet>,
    },
}

impl DocumentReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DocumentOutcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            DocumentOutcome::Failure { kind, .. } => Some(*kind),
            DocumentOutcome::Success { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            DocumentOutcome::Failure { error, .. } => Some(error),
            DocumentOutcome::Success { .. } => None,
        }
    }

    pub fn fields(&self) -> Option<&FieldSet> {
        match &self.outcome {
            DocumentOutcome::Success { fields, .. } => Some(fields),
            DocumentOutcome::Failure { fields, .. } => fields.as_ref(),
        }
    }

    pub fn ratios(&self) -> Option<&RatioSet> {
        match &self.outcome {
            DocumentOutcome::Success { ratios, .. } => Some(ratios),
            DocumentOutcome::Failure { .. } => None,
        }
    }
}

fn failure(kind: FailureKind, error: impl ToString, fields: Option<FieldSet>) -> DocumentOutcome {
    DocumentOutcome::Failure {
        kind,
        error: error.to_string(),
        fields,
    }
}

/// Runs documents through a text source, the field locator and the ratio calculator.
pub struct DocumentPipeline<S = Box<dyn TextSource>> {
    source: S,
    locator: FieldLocator,
    calculator: RatioCalculator,
}

impl DocumentPipeline {
    /// Build the pipeline described by the configuration.
    pub fn from_config(config: &SolvoConfig) -> Result<Self, SolvoError> {
        let table = FieldTable::builtin().with_extra_labels(&config.extraction.extra_labels)?;
        Ok(DocumentPipeline::new(source::from_config(config))
            .with_fields(table)
            .with_rounding(config.extraction.rounding))
    }
}

impl<S: TextSource> DocumentPipeline<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            locator: FieldLocator::new(),
            calculator: RatioCalculator::default(),
        }
    }

    pub fn with_fields(mut self, table: FieldTable) -> Self {
        self.locator = self.locator.with_table(table);
        self
    }

    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.calculator = RatioCalculator::new(rounding);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn locator(&self) -> &FieldLocator {
        &self.locator
    }

    /// Process one document. Never fails; failures are reported in the result.
    pub fn process(&self, document: &Document) -> DocumentReport {
        self.process_text(document, self.source.get_text(document))
    }

    /// Finish a document whose text was already taken from the source.
    pub fn process_text(
        &self,
        document: &Document,
        text: Result<String, SourceError>,
    ) -> DocumentReport {
        let start = Instant::now();
        let outcome = self.run(document, text);

        match &outcome {
            DocumentOutcome::Success { ratios, .. } => info!(
                "{}: success in {:?} (liquidity {})",
                document.filename,
                start.elapsed(),
                ratios.liquidity
            ),
            DocumentOutcome::Failure { kind, error, .. } => {
                warn!("{}: {} ({})", document.filename, kind.as_str(), error)
            }
        }

        DocumentReport {
            filename: document.filename.clone(),
            outcome,
        }
    }

    /// Process documents in order, one report per document.
    pub fn process_batch(&self, documents: &[Document]) -> Vec<DocumentReport> {
        let reports: Vec<_> = documents.iter().map(|d| self.process(d)).collect();
        let succeeded = reports.iter().filter(|r| r.is_success()).count();
        info!("Batch done: {}/{} documents succeeded", succeeded, reports.len());
        reports
    }

    fn run(&self, document: &Document, text: Result<String, SourceError>) -> DocumentOutcome {
        let text = match text {
            Ok(text) => text,
            Err(e) => return failure(FailureKind::SourceUnavailable, e, None),
        };

        let fields = match self.locator.extract(&text) {
            Ok(fields) => fields,
            Err(e) => return failure(FailureKind::from(&e), e, None),
        };

        match self.calculator.compute(&fields) {
            Ok(ratios) => DocumentOutcome::Success {
                size_kb: document.size_kb(),
                fields,
                ratios,
            },
            Err(e) => failure(FailureKind::RatioUndefined, e, Some(fields)),
        }
    }
}
