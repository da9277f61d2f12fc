use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    model_requests: u64,
}

/// `GET /health`: liveness plus which model the assistant is talking to.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.analysis.model_name().to_string(),
        model_requests: state.analysis.counter().total_requests(),
    })
}
