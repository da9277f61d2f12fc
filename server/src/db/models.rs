use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;

pub const DEFAULT_MIME_TYPE: &str = "application/pdf";
pub const DEFAULT_PROVIDER: &str = "Unknown Provider";
pub const DEFAULT_PROFILE_IMAGE: &str = "https://ui-avatars.com/api/?name=User&background=random";

/// Opaque 24-hex-digit identifier shared by every collection.
pub fn new_id() -> String {
    ObjectId::new().to_hex()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordCategory {
    #[serde(rename = "Lab Report")]
    LabReport,
    Prescription,
    Scan,
    Bill,
    Other,
    #[serde(rename = "AI Report")]
    AiReport,
}

impl RecordCategory {
    pub fn label(&self) -> &'static str {
        match self {
            RecordCategory::LabReport => "Lab Report",
            RecordCategory::Prescription => "Prescription",
            RecordCategory::Scan => "Scan",
            RecordCategory::Bill => "Bill",
            RecordCategory::Other => "Other",
            RecordCategory::AiReport => "AI Report",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        [
            RecordCategory::LabReport,
            RecordCategory::Prescription,
            RecordCategory::Scan,
            RecordCategory::Bill,
            RecordCategory::Other,
            RecordCategory::AiReport,
        ]
        .into_iter()
        .find(|c| c.label().eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub status: String,
}

/// Where a record's original file lives.
#[derive(Debug, Clone, PartialEq)]
pub enum FileRef {
    /// Legacy path or URL; the bytes are not held by the store.
    Disk(String),
    Inline { bytes: Vec<u8>, mime_type: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub title: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(rename = "type")]
    pub category: RecordCategory,
    pub provider: String,
    pub date: DateTime<Utc>,
    pub file_url: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_mime_type: Option<String>,
    #[serde(default)]
    pub analysis: Option<Analysis>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user == user_id
    }

    /// Inline data wins over the URL whenever both are present.
    pub fn file_ref(&self) -> Result<FileRef, base64::DecodeError> {
        match self.file_data.as_deref().filter(|d| !d.is_empty()) {
            Some(data) => Ok(FileRef::Inline {
                bytes: BASE64.decode(data)?,
                mime_type: self
                    .file_mime_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            }),
            None => Ok(FileRef::Disk(self.file_url.clone())),
        }
    }
}

pub fn encode_file(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_image: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub blood_type: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub weight: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: Option<String>, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "User".to_string()),
            email,
            password_hash,
            phone: String::new(),
            address: String::new(),
            bio: "Health enthusiast.".to_string(),
            profile_image: DEFAULT_PROFILE_IMAGE.to_string(),
            age: None,
            blood_type: String::new(),
            height: String::new(),
            weight: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            bio: self.bio.clone(),
            profile_image: self.profile_image.clone(),
            age: self.age,
            blood_type: self.blood_type.clone(),
            height: self.height.clone(),
            weight: self.weight.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Client-facing view of a user; carries no credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub bio: String,
    pub profile_image: String,
    pub age: Option<u32>,
    pub blood_type: String,
    pub height: String,
    pub weight: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
