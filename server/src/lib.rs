pub mod analysis;
pub mod auth;
pub mod chat;
pub mod config;
pub mod contact;
pub mod db;
pub mod db_mongo;
pub mod error;
pub mod health;
pub mod insights;
pub mod media_ingestion;
pub mod processing;
pub mod records;
pub mod request_counter;
pub mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, OriginalUri},
    http::{HeaderValue, StatusCode, request::Parts},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::analysis::{AnalysisClient, TextModel};
use crate::auth::JwtKeys;
use crate::config::Config;
use crate::contact::ContactNotifier;
use crate::db::{ContactStore, RecordStore, Stores, UserStore};
use crate::processing::{OcrEngine, TextExtractor};

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub records: Arc<dyn RecordStore>,
    pub users: Arc<dyn UserStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub extractor: TextExtractor,
    pub analysis: Arc<AnalysisClient>,
    pub notifier: Arc<dyn ContactNotifier>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Stores,
        model: Arc<dyn TextModel>,
        ocr: Arc<dyn OcrEngine>,
        notifier: Arc<dyn ContactNotifier>,
    ) -> Self {
        Self {
            extractor: TextExtractor::new(ocr, config.ocr.timeout),
            analysis: Arc::new(AnalysisClient::new(model, config.model.timeout)),
            jwt: JwtKeys::new(&config.jwt_secret, config.jwt_expiry_hours),
            records: stores.records,
            users: stores.users,
            contacts: stores.contacts,
            notifier,
            config: Arc::new(config),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/assistant/upload", post(media_ingestion::upload::handle_file_upload))
        .route("/assistant/analyze", post(media_ingestion::analyze::analyze_health))
        .route("/assistant/chat", post(chat::chat_handler))
        .route("/records", get(records::list_records).post(records::create_record))
        .route("/records/{id}", delete(records::delete_record))
        .route("/records/{id}/view", get(records::view_file))
        .route("/health/insights", get(insights::get_insights))
        .route("/user", get(users::get_profile).put(users::update_profile))
        .route("/user/upload-photo", post(users::upload_photo))
        .route("/contact/submit", post(contact::submit_contact));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(cors_layer(config.cors_origins.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    let message = if uri.path().starts_with("/api") {
        "API route not found"
    } else {
        "Not found"
    };
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

fn cors_layer(extra_origins: Vec<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|o| is_allowed_origin(o, &extra_origins))
                    .unwrap_or(false)
            },
        ))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Local development origins on any port, plus the configured list.
fn is_allowed_origin(origin: &str, extra: &[String]) -> bool {
    let local_port = ["http://localhost:", "http://127.0.0.1:"]
        .iter()
        .find_map(|prefix| origin.strip_prefix(prefix));

    if let Some(port) = local_port {
        return !port.is_empty() && port.chars().all(|c| c.is_ascii_digit());
    }

    extra.iter().any(|allowed| allowed == origin)
}
