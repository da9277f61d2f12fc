use thiserror::Error;

use crate::error::AppError;

pub const ALLOWED_MIME_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg", "image/webp"];

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Error, Debug, PartialEq)]
pub enum UploadRejection {
    #[error("No file uploaded")]
    Missing,

    #[error("File is empty")]
    Empty,

    #[error("File too large. Maximum size is {limit_mb} MB")]
    TooLarge { limit_mb: usize },

    #[error("Invalid file type. Only PDF and images allowed.")]
    UnsupportedType(String),
}

impl From<UploadRejection> for AppError {
    fn from(rejection: UploadRejection) -> Self {
        match rejection {
            UploadRejection::TooLarge { .. } => AppError::PayloadTooLarge(rejection.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// The declared part type without parameters, guessed from the file name
/// when the client sent none or a generic one.
pub fn resolve_content_type(declared: Option<&str>, file_name: &str) -> String {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && ct != FALLBACK_MIME_TYPE);

    declared.unwrap_or_else(|| {
        mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or(FALLBACK_MIME_TYPE)
            .to_string()
    })
}

pub fn validate_upload(content_type: &str, size: usize, max_bytes: usize) -> Result<(), UploadRejection> {
    if size > max_bytes {
        return Err(UploadRejection::TooLarge {
            limit_mb: max_bytes / (1024 * 1024),
        });
    }

    if size == 0 {
        return Err(UploadRejection::Empty);
    }

    if !ALLOWED_MIME_TYPES.contains(&content_type) {
        return Err(UploadRejection::UnsupportedType(content_type.to_string()));
    }

    Ok(())
}

/// Short tag stored on records, e.g. "pdf" or "png".
pub fn file_type_tag(content_type: &str) -> String {
    content_type
        .split('/')
        .nth(1)
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or("pdf")
        .to_string()
}

/// Extension the text extractor dispatches on.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "application/pdf" => "pdf",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "bin",
    }
}
