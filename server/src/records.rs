use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::analysis::Analysis;
use crate::auth::AuthUser;
use crate::db::models::{DEFAULT_MIME_TYPE, FileRef, Record, RecordCategory, new_id};
use crate::error::AppError;

const DIRECT_PROVIDER: &str = "Kenkoo AI Health Assistant";
const DIRECT_FILE_URL: &str = "/ai-report";

/// Body of `POST /api/records`: a report built elsewhere, e.g. the PDF the
/// client renders from a health analysis.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub provider: Option<String>,
    pub file_data: Option<String>,
    pub file_mime_type: Option<String>,
    pub file_type: Option<String>,
    pub analysis: Option<Value>,
    pub summary: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CreateRecordRequest {
    fn into_record(self, owner: &str) -> Result<Record, AppError> {
        let (Some(title), Some(file_data)) = (non_empty(self.title), non_empty(self.file_data)) else {
            return Err(AppError::BadRequest("Title and fileData are required".to_string()));
        };

        if BASE64.decode(&file_data).is_err() {
            return Err(AppError::BadRequest("fileData must be base64 encoded".to_string()));
        }

        let category = match non_empty(self.category) {
            Some(label) => RecordCategory::from_label(&label)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown record type: {}", label)))?,
            None => RecordCategory::AiReport,
        };

        let analysis = match self.analysis {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                Analysis::from_json(value)
                    .map_err(|e| AppError::BadRequest(format!("Invalid analysis: {}", e)))?,
            ),
        };

        let (metrics, recommendations) = analysis
            .as_ref()
            .map(|a| (a.metrics().to_vec(), a.recommendations().to_vec()))
            .unwrap_or_default();

        let now = Utc::now();
        Ok(Record {
            id: new_id(),
            user: owner.to_string(),
            file_name: title.clone(),
            title,
            category,
            provider: non_empty(self.provider).unwrap_or_else(|| DIRECT_PROVIDER.to_string()),
            date: now,
            file_url: DIRECT_FILE_URL.to_string(),
            file_type: non_empty(self.file_type).unwrap_or_else(|| "pdf".to_string()),
            file_data: Some(file_data),
            file_mime_type: Some(
                non_empty(self.file_mime_type).unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            ),
            analysis,
            metrics,
            recommendations,
            summary: self.summary.unwrap_or_default(),
            created_at: now,
        })
    }
}

/// Loads a record and checks that `caller` owns it.
async fn owned_record(state: &AppState, id: &str, caller: &str) -> Result<Record, AppError> {
    let record = state
        .records
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;

    if !record.is_owned_by(caller) {
        tracing::warn!("User {} attempted to access record {} owned by another user", caller, id);
        return Err(AppError::Forbidden("User not authorized".to_string()));
    }

    Ok(record)
}

pub async fn list_records(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Record>>, AppError> {
    let records = state.records.list_for_user(&auth.user_id).await?;
    Ok(Json(records))
}

pub async fn create_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record = payload.into_record(&auth.user_id)?;
    let record = state.records.insert(record).await?;

    tracing::info!("Created {} record {} for user {}", record.category.label(), record.id, record.user);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn view_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let record = owned_record(&state, &id, &auth.user_id).await?;

    let file = record
        .file_ref()
        .map_err(|e| AppError::internal("Server Error", format!("stored file data is corrupt: {}", e)))?;

    match file {
        FileRef::Inline { bytes, mime_type } => {
            Ok(([(header::CONTENT_TYPE, mime_type)], bytes).into_response())
        }
        FileRef::Disk(url) => {
            tracing::debug!("Record {} only has a disk reference: {}", record.id, url);
            Err(AppError::NotFound("File content missing from database".to_string()))
        }
    }
}

pub async fn delete_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let record = owned_record(&state, &id, &auth.user_id).await?;

    if !state.records.delete(&record.id).await? {
        return Err(AppError::NotFound("Record not found".to_string()));
    }

    tracing::info!("Deleted record {} for user {}", record.id, auth.user_id);
    Ok(Json(json!({ "message": "Record removed" })))
}
