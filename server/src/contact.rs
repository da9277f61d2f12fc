use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::db::models::{ContactMessage, new_id};
use crate::error::AppError;

/// Outbound notifications for contact-form submissions.
#[async_trait]
pub trait ContactNotifier: Send + Sync {
    async fn notify_team(&self, message: &ContactMessage) -> anyhow::Result<()>;

    async fn confirm_to_sender(&self, message: &ContactMessage) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl ContactNotifier for LogNotifier {
    async fn notify_team(&self, message: &ContactMessage) -> anyhow::Result<()> {
        tracing::info!(
            "Contact form from {} <{}>: {}",
            message.name,
            message.email,
            message.subject
        );
        Ok(())
    }

    async fn confirm_to_sender(&self, message: &ContactMessage) -> anyhow::Result<()> {
        tracing::info!("Confirmation for contact {} queued to {}", message.id, message.email);
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub message: &'static str,
    pub success: bool,
}

impl ContactRequest {
    fn into_message(self) -> Result<ContactMessage, AppError> {
        let fields = [&self.name, &self.email, &self.subject, &self.message];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AppError::BadRequest("All fields are required".to_string()));
        }

        Ok(ContactMessage {
            id: new_id(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Persists first; notifications never affect the response.
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    let message = payload.into_message()?;
    let message = state
        .contacts
        .insert(message)
        .await
        .map_err(|e| AppError::internal("Server error", e))?;

    match state.notifier.notify_team(&message).await {
        Ok(()) => {
            if let Err(e) = state.notifier.confirm_to_sender(&message).await {
                tracing::warn!("Failed to send contact confirmation to {}: {:#}", message.email, e);
            }
        }
        Err(e) => {
            tracing::error!("Failed to send contact notification, message {} saved: {:#}", message.id, e);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            message: "Message sent successfully",
            success: true,
        }),
    ))
}
