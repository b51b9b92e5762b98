//! Text sources: where the statement text for a document comes from.
//!
//! A document's text is read from its native layer first. Only when that is
//! blank does the OCR source run on the scanned page images.

use std::path::Path;

use rust_decimal::prelude::*;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::models::config::SolvoConfig;
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Result type for text sources.
pub type Result<T> = std::result::Result<T, SourceError>;

/// An uploaded or on-disk document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Name reported back in the document's result.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// What a document's bytes contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
    Unknown,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Classify by extension, falling back to the PDF magic bytes.
    pub fn kind(&self) -> DocumentKind {
        match self.extension().as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            Some("png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp") => DocumentKind::Image,
            Some("txt") => DocumentKind::Text,
            _ if self.bytes.starts_with(b"%PDF-") => DocumentKind::Pdf,
            _ => DocumentKind::Unknown,
        }
    }

    /// Size in kilobytes, rounded to one fraction digit.
    pub fn size_kb(&self) -> Decimal {
        (Decimal::from(self.bytes.len()) / Decimal::from(1024))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// Produces the plain text of a document.
///
/// Returning an empty or whitespace-only string means "nothing here", which
/// lets a [`FallbackTextSource`] move on to its secondary source.
///
/// Sources are shared across threads by the upload server.
pub trait TextSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Get the text of a document.
    fn get_text(&self, document: &Document) -> Result<String>;
}

impl<T: TextSource + ?Sized> TextSource for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get_text(&self, document: &Document) -> Result<String> {
        (**self).get_text(document)
    }
}

/// Serves `.txt` documents as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextSource;

impl TextSource for PlainTextSource {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn get_text(&self, document: &Document) -> Result<String> {
        match document.kind() {
            DocumentKind::Text => Ok(String::from_utf8_lossy(&document.bytes).into_owned()),
            _ => Ok(String::new()),
        }
    }
}

/// Reads the native text layer of a PDF.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextSource;

impl TextSource for PdfTextSource {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn get_text(&self, document: &Document) -> Result<String> {
        if document.kind() != DocumentKind::Pdf {
            return Ok(String::new());
        }

        let extractor = PdfExtractor::from_bytes(&document.bytes)
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let text = extractor
            .extract_text()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        debug!(
            "{}: {} pages, {} chars of native text",
            document.filename,
            extractor.page_count(),
            text.len()
        );
        Ok(text)
    }
}

/// Tries `primary`, then `secondary` when the primary text is blank or fails.
#[derive(Debug, Clone)]
pub struct FallbackTextSource<P, S> {
    primary: P,
    secondary: S,
    min_text_length: usize,
}

impl<P: TextSource, S: TextSource> FallbackTextSource<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self {
            primary,
            secondary,
            min_text_length: 1,
        }
    }

    /// Require at least `min` non-whitespace characters before text counts as usable.
    pub fn with_min_text_length(mut self, min: usize) -> Self {
        self.min_text_length = min.max(1);
        self
    }

    fn usable(&self, text: &str) -> bool {
        text.chars().filter(|c| !c.is_whitespace()).count() >= self.min_text_length
    }
}

impl<P: TextSource, S: TextSource> TextSource for FallbackTextSource<P, S> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn get_text(&self, document: &Document) -> Result<String> {
        let primary_failure = match self.primary.get_text(document) {
            Ok(text) if self.usable(&text) => return Ok(text),
            Ok(_) => format!("{}: no text", self.primary.name()),
            Err(e) => {
                warn!("{}: {} source failed: {}", document.filename, self.primary.name(), e);
                format!("{}: {}", self.primary.name(), e)
            }
        };

        debug!(
            "{}: falling back from {} to {}",
            document.filename,
            self.primary.name(),
            self.secondary.name()
        );

        match self.secondary.get_text(document) {
            Ok(text) if self.usable(&text) => Ok(text),
            Ok(_) => Err(SourceError::Unavailable(format!(
                "{}; {}: no text",
                primary_failure,
                self.secondary.name()
            ))),
            Err(e) => Err(SourceError::Unavailable(format!(
                "{}; {}: {}",
                primary_failure,
                self.secondary.name(),
                e
            ))),
        }
    }
}

#[cfg(feature = "ocr")]
mod ocr_source {
    use std::sync::{Mutex, OnceLock};

    use image::DynamicImage;
    use tracing::{debug, info};

    use super::{Document, DocumentKind, Result, TextSource};
    use crate::error::{OcrError, SourceError};
    use crate::models::config::OcrConfig;
    use crate::ocr::OcrEngine;
    use crate::pdf::{PdfExtractor, PdfProcessor};

    /// Recognizes scanned pages and image files with the OCR engine.
    ///
    /// The engine is loaded once, on first use, so documents with a native
    /// text layer never pay for model loading. Recognition calls are
    /// serialized on the loaded engine.
    pub struct OcrTextSource {
        config: OcrConfig,
        max_pages: usize,
        engine: OnceLock<std::result::Result<Mutex<OcrEngine>, String>>,
    }

    impl OcrTextSource {
        pub fn new(config: OcrConfig, max_pages: usize) -> Self {
            Self {
                config,
                max_pages,
                engine: OnceLock::new(),
            }
        }

        fn engine(&self) -> Result<&Mutex<OcrEngine>> {
            self.engine
                .get_or_init(|| {
                    OcrEngine::from_config(&self.config)
                        .map(Mutex::new)
                        .map_err(|e| e.to_string())
                })
                .as_ref()
                .map_err(|e| SourceError::Unavailable(e.clone()))
        }

        fn page_images(&self, document: &Document) -> Result<Vec<DynamicImage>> {
            let extractor = PdfExtractor::from_bytes(&document.bytes)
                .map_err(|e| SourceError::Unavailable(e.to_string()))?;

            let page_count = extractor.page_count();
            let last_page = match self.max_pages {
                0 => page_count,
                max => page_count.min(max as u32),
            };

            let mut images = Vec::new();
            for page in 1..=last_page {
                let page_images = extractor
                    .extract_images(page)
                    .map_err(|e| SourceError::Unavailable(e.to_string()))?;
                images.extend(page_images);
            }

            if images.is_empty() {
                return Err(SourceError::Unavailable(OcrError::NoImages.to_string()));
            }
            debug!("{}: {} page images to OCR", document.filename, images.len());
            Ok(images)
        }

        fn recognize(&self, images: &[DynamicImage]) -> Result<String> {
            let engine = self
                .engine()?
                .lock()
                .map_err(|_| SourceError::Unavailable("OCR engine poisoned".to_string()))?;
            let pages = images
                .iter()
                .map(|image| engine.extract_text(image))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SourceError::Unavailable(e.to_string()))?;
            Ok(pages.join("\n"))
        }
    }

    impl TextSource for OcrTextSource {
        fn name(&self) -> &'static str {
            "ocr"
        }

        fn get_text(&self, document: &Document) -> Result<String> {
            let images = match document.kind() {
                DocumentKind::Pdf => self.page_images(document)?,
                DocumentKind::Image => {
                    let image = image::load_from_memory(&document.bytes)
                        .map_err(|e| SourceError::Unavailable(e.to_string()))?;
                    vec![image]
                }
                DocumentKind::Text | DocumentKind::Unknown => return Ok(String::new()),
            };

            info!("{}: running OCR on {} images", document.filename, images.len());
            self.recognize(&images)
        }
    }
}

#[cfg(feature = "ocr")]
pub use ocr_source::OcrTextSource;

/// Build the text source chain described by the configuration.
///
/// Plain text first, then the PDF text layer, then OCR when enabled.
pub fn from_config(config: &SolvoConfig) -> Box<dyn TextSource> {
    let native = FallbackTextSource::new(PlainTextSource, PdfTextSource)
        .with_min_text_length(config.pdf.min_text_length);

    if config.ocr.enabled {
        return with_ocr(native, config);
    }
    Box::new(native)
}

#[cfg(feature = "ocr")]
fn with_ocr<P: TextSource + 'static>(native: P, config: &SolvoConfig) -> Box<dyn TextSource> {
    let ocr = OcrTextSource::new(config.ocr.clone(), config.pdf.max_pages);
    Box::new(FallbackTextSource::new(native, ocr).with_min_text_length(config.pdf.min_text_length))
}

#[cfg(not(feature = "ocr"))]
fn with_ocr<P: TextSource + 'static>(native: P, _config: &SolvoConfig) -> Box<dyn TextSource> {
    warn!("OCR is enabled in the configuration but this build has no OCR support");
    Box::new(native)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixed(&'static str, std::result::Result<&'static str, &'static str>);

    impl TextSource for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn get_text(&self, _document: &Document) -> Result<String> {
            self.1
                .map(str::to_string)
                .map_err(|e| SourceError::Unavailable(e.to_string()))
        }
    }

    fn doc(name: &str, bytes: &[u8]) -> Document {
        Document::new(name, bytes.to_vec())
    }

    #[test]
    fn test_document_kind() {
        assert_eq!(doc("a.PDF", b"").kind(), DocumentKind::Pdf);
        assert_eq!(doc("scan.jpeg", b"").kind(), DocumentKind::Image);
        assert_eq!(doc("notes.txt", b"").kind(), DocumentKind::Text);
        assert_eq!(doc("upload", b"%PDF-1.7\n").kind(), DocumentKind::Pdf);
        assert_eq!(doc("data.xlsx", b"PK").kind(), DocumentKind::Unknown);
    }

    #[test]
    fn test_size_kb() {
        assert_eq!(doc("a.txt", &[0; 2048]).size_kb(), Decimal::new(20, 1));
        assert_eq!(doc("a.txt", &[0; 1587]).size_kb(), Decimal::new(15, 1));
        assert_eq!(doc("a.txt", b"").size_kb(), Decimal::ZERO);
    }

    #[test]
    fn test_plain_source() {
        let text = PlainTextSource
            .get_text(&doc("a.txt", "Riesgo: 1.000,00".as_bytes()))
            .unwrap();
        assert_eq!(text, "Riesgo: 1.000,00");
        assert_eq!(PlainTextSource.get_text(&doc("a.pdf", b"%PDF-")).unwrap(), "");
    }

    #[test]
    fn test_pdf_source_skips_other_kinds_and_rejects_garbage() {
        assert_eq!(PdfTextSource.get_text(&doc("a.txt", b"hello")).unwrap(), "");
        assert!(PdfTextSource.get_text(&doc("broken.pdf", b"not a pdf")).is_err());
    }

    #[test]
    fn test_fallback_prefers_primary() {
        let source = FallbackTextSource::new(Fixed("native", Ok("text")), Fixed("ocr", Ok("scan")));
        assert_eq!(source.get_text(&doc("a.pdf", b"")).unwrap(), "text");
    }

    #[test]
    fn test_fallback_on_blank_or_error() {
        let blank = FallbackTextSource::new(Fixed("native", Ok(" \n\t")), Fixed("ocr", Ok("scan")));
        assert_eq!(blank.get_text(&doc("a.pdf", b"")).unwrap(), "scan");

        let failed = FallbackTextSource::new(Fixed("native", Err("bad xref")), Fixed("ocr", Ok("scan")));
        assert_eq!(failed.get_text(&doc("a.pdf", b"")).unwrap(), "scan");
    }

    #[test]
    fn test_fallback_min_text_length() {
        let source = FallbackTextSource::new(Fixed("native", Ok("ab")), Fixed("ocr", Ok("scanned")))
            .with_min_text_length(3);
        assert_eq!(source.get_text(&doc("a.pdf", b"")).unwrap(), "scanned");
    }

    #[test]
    fn test_both_sources_fail() {
        let source = FallbackTextSource::new(Fixed("native", Ok("")), Fixed("ocr", Err("model missing")));
        let err = source.get_text(&doc("a.pdf", b"")).unwrap_err();
        assert_eq!(
            err.to_string(),
            SourceError::Unavailable("native: no text; ocr: model missing".to_string()).to_string()
        );
    }

    #[test]
    fn test_from_config_without_ocr() {
        let mut config = SolvoConfig::default();
        config.ocr.enabled = false;
        let source = from_config(&config);

        let text = source.get_text(&doc("a.txt", b"Activo Corriente 1,00")).unwrap();
        assert_eq!(text, "Activo Corriente 1,00");
        assert!(source.get_text(&doc("a.bin", b"\x00\x01")).is_err());
    }
}
