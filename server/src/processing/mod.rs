pub mod image;
pub mod pdf;

pub use image::{OcrEngine, TesseractCli};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("no extractable text")]
    NoText,

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR did not finish within {0:?}")]
    OcrTimeout(Duration),
}

/// Turns a saved upload into plain text, choosing the strategy by extension.
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
    ocr_timeout: Duration,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, ocr_timeout: Duration) -> Self {
        Self { ocr, ocr_timeout }
    }

    pub async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => {
                let data = read(path).await?;
                tokio::task::spawn_blocking(move || pdf::extract_text(&data))
                    .await
                    .map_err(|e| ExtractionError::InvalidPdf(e.to_string()))?
            }
            "png" | "jpg" | "jpeg" | "webp" => self.ocr_image(path).await,
            other => Err(ExtractionError::UnsupportedFormat(if other.is_empty() {
                "no extension".to_string()
            } else {
                other.to_string()
            })),
        }
    }

    async fn ocr_image(&self, path: &Path) -> Result<String, ExtractionError> {
        let data = read(path).await?;
        tokio::task::spawn_blocking(move || image::validate_image(&data))
            .await
            .map_err(|e| ExtractionError::InvalidImage(e.to_string()))??;

        let text = tokio::time::timeout(self.ocr_timeout, self.ocr.recognize(path))
            .await
            .map_err(|_| ExtractionError::OcrTimeout(self.ocr_timeout))??;

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }

        tracing::debug!("OCR recognized {} characters from {}", text.len(), path.display());
        Ok(text)
    }
}

async fn read(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    tokio::fs::read(path).await.map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}
