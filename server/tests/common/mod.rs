#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use kenkoo_server::analysis::TextModel;
use kenkoo_server::config::Config;
use kenkoo_server::contact::LogNotifier;
use kenkoo_server::db::Stores;
use kenkoo_server::db::models::{DEFAULT_PROVIDER, Metric, Record, RecordCategory, new_id};
use kenkoo_server::processing::{ExtractionError, OcrEngine};
use kenkoo_server::{AppState, create_app};

pub const BOUNDARY: &str = "----kenkootestboundary7MA4YWxkTrZu0gW";

/// Replies with a fixed string, or fails, and counts every call.
pub struct ScriptedModel {
    reply: String,
    fail: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if self.fail {
            anyhow::bail!("model unavailable");
        }
        Ok(self.reply.clone())
    }
}

pub struct FixedOcr(pub String);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn recognize(&self, _path: &Path) -> Result<String, ExtractionError> {
        Ok(self.0.clone())
    }
}

/// Never finishes; only the OCR timeout ends it.
pub struct StalledOcr;

#[async_trait]
impl OcrEngine for StalledOcr {
    async fn recognize(&self, _path: &Path) -> Result<String, ExtractionError> {
        std::future::pending().await
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub model: Arc<ScriptedModel>,
    pub upload_dir: TempDir,
}

pub const LAB_REPLY: &str = r#"Here is the analysis:
```json
{
  "title": "Complete Blood Count",
  "type": "Lab Report",
  "provider": "City Lab",
  "date": "2024-03-01",
  "summary": "Hemoglobin is within range.",
  "answer_to_user": "Your results look normal.",
  "metrics": [{"name": "Hemoglobin", "value": "13.2", "unit": "g/dL", "status": "Normal"}],
  "recommendations": ["Stay hydrated"]
}
```"#;

impl TestApp {
    pub fn new() -> Self {
        Self::with(ScriptedModel::replying(LAB_REPLY), 25 * 1024 * 1024)
    }

    pub fn with(model: ScriptedModel, max_upload_bytes: usize) -> Self {
        Self::build(
            model,
            Arc::new(FixedOcr("Glucose 95 mg/dL".to_string())),
            |config| config.max_upload_bytes = max_upload_bytes,
        )
    }

    pub fn with_ocr(ocr: Arc<dyn OcrEngine>, ocr_timeout: Duration) -> Self {
        Self::build(ScriptedModel::replying(LAB_REPLY), ocr, |config| {
            config.ocr.timeout = ocr_timeout
        })
    }

    fn build(model: ScriptedModel, ocr: Arc<dyn OcrEngine>, configure: impl FnOnce(&mut Config)) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            upload_dir: upload_dir.path().to_path_buf(),
            jwt_secret: "integration_secret".to_string(),
            ..Config::default()
        };
        configure(&mut config);

        let model = Arc::new(model);
        let state = AppState::new(config, Stores::in_memory(), model.clone(), ocr, Arc::new(LogNotifier));

        Self {
            router: create_app(state.clone()),
            state,
            model,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!("Non-JSON body ({}): {}", status, String::from_utf8_lossy(&body))
            })
        };
        (status, json)
    }

    /// Signs up `email` and returns `(token, user_id)`.
    pub async fn signup(&self, email: &str) -> (String, String) {
        let (status, json) = self
            .send_json(json_request(
                "POST",
                "/api/auth/signup",
                None,
                json!({ "name": "Test User", "email": email, "password": "password123" }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", json);
        (
            json["token"].as_str().unwrap().to_string(),
            json["user"]["_id"].as_str().unwrap().to_string(),
        )
    }

    pub fn uploads_left(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                field,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        field, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", format!("multipart/form-data; boundary={}", BOUNDARY));
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

/// Single-page PDF with one line in its text layer.
pub fn pdf_bytes(line: &str) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(line)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn lab_record(owner: &str, date: DateTime<Utc>, metrics: Vec<Metric>) -> Record {
    Record {
        id: new_id(),
        user: owner.to_string(),
        title: format!("Lab {}", date.format("%Y-%m-%d")),
        file_name: "lab.pdf".to_string(),
        category: RecordCategory::LabReport,
        provider: DEFAULT_PROVIDER.to_string(),
        date,
        file_url: "/uploads/lab.pdf".to_string(),
        file_type: "pdf".to_string(),
        file_data: None,
        file_mime_type: None,
        analysis: None,
        metrics,
        recommendations: Vec::new(),
        summary: String::new(),
        created_at: date,
    }
}

pub fn metric(name: &str, value: f64) -> Metric {
    Metric {
        name: name.to_string(),
        value,
        unit: "g/dL".to_string(),
        status: "Normal".to_string(),
    }
}
