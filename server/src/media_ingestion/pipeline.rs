//! Upload → extract → analyze → persist → cleanup for one document.
//!
//! Extraction and analysis failures degrade the record; only a failed save
//! aborts the request.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use super::validation::file_type_tag;
use super::{UploadedFile, remove_temp, save_upload};
use crate::AppState;
use crate::analysis::{Analysis, DocumentReport};
use crate::db::models::{DEFAULT_PROVIDER, Record, RecordCategory, encode_file, new_id};
use crate::error::AppError;

pub const EXTRACTION_FAILED_TEXT: &str = "Text extraction failed.";
pub const NO_SUMMARY: &str = "No summary available.";
const DEFAULT_RESULT: &str = "Analysis complete.";

pub struct IntakeRequest {
    pub owner: String,
    pub file: UploadedFile,
    pub question: Option<String>,
    pub manual_category: Option<RecordCategory>,
}

#[derive(Debug, Serialize)]
pub struct IntakeOutcome {
    pub success: bool,
    pub result: String,
    pub analysis: Analysis,
    pub record: Record,
}

pub async fn run_intake(state: &AppState, request: IntakeRequest) -> Result<IntakeOutcome, AppError> {
    let path = save_upload(&state.config.upload_dir, &request.file)
        .await
        .map_err(|e| AppError::internal("Processing failed", e))?;

    let outcome = process(state, &path, request).await;
    remove_temp(&path).await;
    outcome
}

async fn process(state: &AppState, path: &Path, request: IntakeRequest) -> Result<IntakeOutcome, AppError> {
    let text = match state.extractor.extract(path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Text extraction failed for {}: {}", request.file.original_name, e);
            EXTRACTION_FAILED_TEXT.to_string()
        }
    };

    let analysis = match state
        .analysis
        .analyze_document(&text, request.question.as_deref())
        .await
    {
        Ok(parsed) => Analysis::from_document_response(parsed),
        Err(e) => {
            tracing::error!("AI analysis failed for {}: {}", request.file.original_name, e);
            Analysis::Document(DocumentReport::analysis_unavailable())
        }
    };

    let record = build_record(&request, path, &analysis);
    let record = state
        .records
        .insert(record)
        .await
        .map_err(|e| AppError::internal("Processing failed", e))?;

    tracing::info!(
        "Stored record {} ({}) for user {}",
        record.id,
        record.category.label(),
        record.user
    );

    Ok(IntakeOutcome {
        success: true,
        result: result_text(&analysis),
        analysis,
        record,
    })
}

fn build_record(request: &IntakeRequest, path: &Path, analysis: &Analysis) -> Record {
    let now = Utc::now();
    let file = &request.file;
    let stored_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Record {
        id: new_id(),
        user: request.owner.clone(),
        title: file.original_name.clone(),
        file_name: file.original_name.clone(),
        category: request
            .manual_category
            .or_else(|| analysis.category())
            .unwrap_or(RecordCategory::LabReport),
        provider: non_empty(analysis.provider()).unwrap_or(DEFAULT_PROVIDER).to_string(),
        date: analysis.date().unwrap_or(now),
        file_url: format!("/uploads/{}", stored_name),
        file_type: file_type_tag(&file.content_type),
        file_data: Some(encode_file(&file.bytes)),
        file_mime_type: Some(file.content_type.clone()),
        analysis: Some(analysis.clone()),
        metrics: analysis.metrics().to_vec(),
        recommendations: analysis.recommendations().to_vec(),
        summary: non_empty(analysis.summary()).unwrap_or(NO_SUMMARY).to_string(),
        created_at: now,
    }
}

fn result_text(analysis: &Analysis) -> String {
    non_empty(analysis.answer_to_user())
        .or_else(|| non_empty(analysis.summary()))
        .unwrap_or(DEFAULT_RESULT)
        .to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
