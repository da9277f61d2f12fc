//! Upload boundary: multipart reading, file constraints, temporary storage,
//! and the handlers that feed uploads into extraction and analysis.

pub mod analyze;
pub mod pipeline;
pub mod upload;
pub mod validation;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::Bytes;
use chrono::Utc;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::AppError;
use validation::{UploadRejection, extension_for, resolve_content_type, validate_upload};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn validate(&self, max_bytes: usize) -> Result<(), UploadRejection> {
        validate_upload(&self.content_type, self.bytes.len(), max_bytes)
    }
}

/// A multipart body split into its single file part and its text fields.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl MultipartForm {
    /// Trimmed text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// A field carrying a JSON document. Unparseable input counts as absent.
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = self.text(name)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed `{}` field: {}", name, e);
                None
            }
        }
    }
}

pub async fn read_multipart(mut multipart: Multipart, file_field: &str) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        if name == file_field {
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = resolve_content_type(field.content_type(), &original_name);
            let bytes = field.bytes().await.map_err(multipart_error)?;

            form.file = Some(UploadedFile {
                original_name,
                content_type,
                bytes,
            });
        } else if !name.is_empty() {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File too large".to_string())
    } else {
        AppError::BadRequest(format!("Failed to read multipart: {}", e.body_text()))
    }
}

/// Writes the upload under a name no concurrent request can collide with.
pub async fn save_upload(dir: &Path, file: &UploadedFile) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let name = format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension_for(&file.content_type)
    );
    let path = dir.join(name);
    tokio::fs::write(&path, &file.bytes).await?;

    tracing::debug!("Saved upload {} to {}", file.original_name, path.display());
    Ok(path)
}

/// Best effort; a leftover file never fails the request.
pub async fn remove_temp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Cleanup failed for {}: {}", path.display(), e);
    }
}
