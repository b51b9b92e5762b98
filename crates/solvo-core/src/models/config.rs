//! Configuration structures for the extraction pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ratios::Rounding;
use crate::statement::FieldKey;

/// Main configuration for the solvo pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolvoConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR fallback configuration.
    pub ocr: OcrConfig,

    /// Field extraction and ratio configuration.
    pub extraction: ExtractionConfig,

    /// Upload server configuration.
    pub server: ServerConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum non-whitespace characters for native text to count as usable.
    pub min_text_length: usize,

    /// Maximum pages to OCR (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 1,
            max_pages: 10,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Fall back to OCR when a document has no native text.
    pub enabled: bool,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` markers in recognized text instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// Field extraction and ratio configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Midpoint rule for ratio quantization.
    pub rounding: Rounding,

    /// Additional label phrases per field, tried after the built-in ones.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_labels: BTreeMap<FieldKey, Vec<String>>,
}

/// Upload server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,

    /// Maximum accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl SolvoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolvoError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SolvoConfig = serde_json::from_str(
            r#"{
                "extraction": {
                    "rounding": "half_even",
                    "extra_labels": { "riesgo": ["Riesgo vivo"] }
                },
                "ocr": { "enabled": false }
            }"#,
        )
        .unwrap();

        assert_eq!(config.extraction.rounding, Rounding::HalfEven);
        assert_eq!(
            config.extraction.extra_labels.get(&FieldKey::Riesgo),
            Some(&vec!["Riesgo vivo".to_string()])
        );
        assert!(!config.ocr.enabled);
        assert_eq!(config.ocr.detection_model, "det.onnx");
        assert_eq!(config.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_unknown_field_key_is_rejected() {
        let parsed: std::result::Result<SolvoConfig, _> =
            serde_json::from_str(r#"{ "extraction": { "extra_labels": { "ventas": ["x"] } } }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_from_file_reports_io_and_parse_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(SolvoConfig::from_file(&missing), Err(SolvoError::Io(_))));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, r#"{ "pdf": { "max_pages": "ten" } }"#).unwrap();
        assert!(matches!(SolvoConfig::from_file(&broken), Err(SolvoError::Json(_))));

        let saved = dir.path().join("saved.json");
        let mut config = SolvoConfig::default();
        config.pdf.max_pages = 3;
        config.save(&saved).unwrap();
        assert_eq!(SolvoConfig::from_file(&saved).unwrap().pdf.max_pages, 3);
    }

    #[test]
    fn test_default_round_trips_through_json() {
        let json = serde_json::to_string(&SolvoConfig::default()).unwrap();
        let back: SolvoConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pdf.max_pages, 10);
        assert_eq!(back.extraction.rounding, Rounding::HalfAwayFromZero);
    }
}
