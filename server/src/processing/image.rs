use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use image::ImageReader;
use tokio::process::Command;

use super::ExtractionError;

/// Optical character recognition over an image file on disk.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Checks that the bytes decode as an image before handing them to OCR.
pub fn validate_image(data: &[u8]) -> Result<(), ExtractionError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ExtractionError::InvalidImage(e.to_string()))?
        .decode()
        .map_err(|e| ExtractionError::InvalidImage(e.to_string()))?;

    Ok(())
}

/// Runs the `tesseract` command-line tool, one process per image.
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, path: &Path) -> Result<String, ExtractionError> {
        // Dropped on timeout, so the child must not outlive the future.
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExtractionError::Ocr(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
