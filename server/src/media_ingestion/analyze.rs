use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::Serialize;

use super::{UploadedFile, read_multipart, remove_temp, save_upload};
use crate::AppState;
use crate::analysis::{ClinicalAssessment, HealthInput, MedicalHistory, Vitals};
use crate::auth::AuthUser;
use crate::error::AppError;

pub const DOCUMENT_EXTRACTION_FAILED_TEXT: &str = "Document uploaded but text extraction failed.";

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: ClinicalAssessment,
}

/// `POST /api/assistant/analyze`: symptoms plus optional vitals, history,
/// language and supporting document. Nothing is persisted.
pub async fn analyze_health(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut form = read_multipart(multipart, "file").await?;

    let symptoms = form
        .text("symptoms")
        .ok_or_else(|| AppError::BadRequest("Symptoms are required for analysis.".to_string()))?;

    let vitals: Option<Vitals> = form.json("vitals");
    let medical_history: Option<MedicalHistory> = form.json("medicalHistory");
    let language = form.text("language").unwrap_or_else(|| "English".to_string());

    let document_text = match form.file.take() {
        Some(file) => {
            file.validate(state.config.max_upload_bytes)?;
            Some(document_text(&state, &file).await)
        }
        None => None,
    };

    tracing::info!(
        "Health analysis for {} (vitals: {}, history: {}, document: {})",
        auth.user_id,
        vitals.is_some(),
        medical_history.is_some(),
        document_text.is_some()
    );

    let input = HealthInput {
        symptoms,
        vitals,
        medical_history,
        document_text,
        language,
    };

    let parsed = state
        .analysis
        .analyze_health_condition(&input)
        .await
        .map_err(|e| AppError::internal("Health analysis failed", e))?;

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis: ClinicalAssessment::from_response(parsed),
    }))
}

/// Text of the supporting document; the temporary copy is gone on return.
async fn document_text(state: &AppState, file: &UploadedFile) -> String {
    let path = match save_upload(&state.config.upload_dir, file).await {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("Could not stage {} for extraction: {}", file.original_name, e);
            return DOCUMENT_EXTRACTION_FAILED_TEXT.to_string();
        }
    };

    let text = match state.extractor.extract(&path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Document text extraction failed: {}", e);
            DOCUMENT_EXTRACTION_FAILED_TEXT.to_string()
        }
    };

    remove_temp(&path).await;
    text
}
