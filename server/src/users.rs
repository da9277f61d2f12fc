use axum::{
    Json,
    extract::{Multipart, State},
    http::{HeaderMap, header},
};
use chrono::Utc;
use serde::{Deserialize, Deserializer};

use crate::AppState;
use crate::analysis::lenient;
use crate::auth::AuthUser;
use crate::db::models::{User, UserProfile};
use crate::error::AppError;
use crate::media_ingestion::validation::UploadRejection;
use crate::media_ingestion::{read_multipart, save_upload};

/// Editable profile attributes. Absent fields are left unchanged; email and
/// password are not accepted here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "age_field")]
    pub age: Option<Option<u32>>,
    pub blood_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub profile_image: Option<String>,
}

/// Present-but-blank clears the age.
fn age_field<'de, D>(deserializer: D) -> Result<Option<Option<u32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let age = lenient::opt_number(deserializer)?;
    Ok(Some(
        age.filter(|a| (0.0..150.0).contains(a)).map(|a| a.round() as u32),
    ))
}

impl ProfileUpdate {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(address) = self.address {
            user.address = address;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
        if let Some(age) = self.age {
            user.age = age;
        }
        if let Some(blood_type) = self.blood_type {
            user.blood_type = blood_type;
        }
        if let Some(height) = self.height {
            user.height = height;
        }
        if let Some(weight) = self.weight {
            user.weight = weight;
        }
        if let Some(profile_image) = self.profile_image {
            user.profile_image = profile_image;
        }
        user.updated_at = Utc::now();
    }
}

async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, AppError> {
    state
        .users
        .find_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    let user = current_user(&state, &auth).await?;
    Ok(Json(user.profile()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let mut user = current_user(&state, &auth).await?;
    update.apply(&mut user);
    state
        .users
        .update(&user)
        .await
        .map_err(|e| AppError::internal("Server error updating profile", e))?;

    Ok(Json(user.profile()))
}

/// Absolute URL of a file under `/uploads`, built from the request's host.
fn public_upload_url(headers: &HeaderMap, file_name: &str) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    format!("{}://{}/uploads/{}", scheme, host, file_name)
}

pub async fn upload_photo(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UserProfile>, AppError> {
    let mut form = read_multipart(multipart, "profileImage").await?;
    let file = form.file.take().ok_or(UploadRejection::Missing)?;
    file.validate(state.config.max_upload_bytes)?;

    let mut user = current_user(&state, &auth).await?;

    let path = save_upload(&state.config.upload_dir, &file)
        .await
        .map_err(|e| AppError::internal("Server error uploading image", e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    user.profile_image = public_upload_url(&headers, &file_name);
    user.updated_at = Utc::now();
    state
        .users
        .update(&user)
        .await
        .map_err(|e| AppError::internal("Server error uploading image", e))?;

    tracing::info!("Updated profile image for {}", user.id);
    Ok(Json(user.profile()))
}
