use axum::{
    extract::{Multipart, State},
    response::Json,
};

use super::pipeline::{IntakeOutcome, IntakeRequest, run_intake};
use super::read_multipart;
use super::validation::UploadRejection;
use crate::AppState;
use crate::auth::AuthUser;
use crate::db::models::RecordCategory;
use crate::error::AppError;

/// `POST /api/assistant/upload`: multipart `file`, optional `message`
/// (or `question`) and optional manual `type`.
pub async fn handle_file_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Json<IntakeOutcome>, AppError> {
    let mut form = read_multipart(multipart, "file").await?;

    let file = form.file.take().ok_or(UploadRejection::Missing)?;
    file.validate(state.config.max_upload_bytes)?;

    let question = form.text("message").or_else(|| form.text("question"));
    let manual_category = form
        .text("type")
        .map(|label| {
            RecordCategory::from_label(&label)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown record type: {}", label)))
        })
        .transpose()?;

    tracing::info!(
        "Upload from {}: {} ({}, {} bytes)",
        auth.user_id,
        file.original_name,
        file.content_type,
        file.bytes.len()
    );

    let outcome = run_intake(
        &state,
        IntakeRequest {
            owner: auth.user_id,
            file,
            question,
            manual_category,
        },
    )
    .await?;

    Ok(Json(outcome))
}
