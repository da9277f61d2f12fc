use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Hosted model backends the analysis client can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    Gemini,
    OpenAi,
}

impl ModelProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            ModelProvider::Gemini => "gemini-2.5-flash",
            ModelProvider::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ModelProvider::Gemini),
            "openai" => Ok(ModelProvider::OpenAi),
            other => Err(format!("unknown model provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub name: String,
    pub api_key: Option<String>,
    /// Only used by the OpenAI-compatible backend.
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub binary: String,
    pub language: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// When unset the server falls back to the in-memory store.
    pub mongo_uri: Option<String>,
    pub mongo_db: String,

    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,

    pub model: ModelConfig,
    pub ocr: OcrConfig,

    pub upload_dir: PathBuf,
    /// Upload limit in bytes (default: 25 MB)
    pub max_upload_bytes: usize,

    /// Extra allowed CORS origins; localhost is always allowed.
    pub cors_origins: Vec<String>,
}

pub const DEFAULT_JWT_SECRET: &str = "secret_key";

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            mongo_uri: None,
            mongo_db: "kenkoo".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
            model: ModelConfig {
                provider: ModelProvider::Gemini,
                name: ModelProvider::Gemini.default_model().to_string(),
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                timeout: Duration::from_secs(90),
            },
            ocr: OcrConfig {
                binary: "tesseract".to_string(),
                language: "eng".to_string(),
                timeout: Duration::from_secs(60),
            },
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 25 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let provider = env::var("MODEL_PROVIDER")
            .ok()
            .and_then(|v| match v.parse::<ModelProvider>() {
                Ok(provider) => Some(provider),
                Err(e) => {
                    tracing::warn!("{}, falling back to gemini", e);
                    None
                }
            })
            .unwrap_or(default.model.provider);

        let api_key = match provider {
            ModelProvider::Gemini => env::var("GEMINI_API_KEY").ok(),
            ModelProvider::OpenAi => env::var("OPENAI_API_KEY").ok(),
        };

        Self {
            host: env::var("HOST").unwrap_or(default.host),
            port: parse_env("PORT").unwrap_or(default.port),

            mongo_uri: env::var("MONGO_URI").ok().filter(|v| !v.trim().is_empty()),
            mongo_db: env::var("MONGO_DB").unwrap_or(default.mongo_db),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),
            jwt_expiry_hours: parse_env("JWT_EXPIRY_HOURS").unwrap_or(default.jwt_expiry_hours),

            model: ModelConfig {
                provider,
                name: env::var("MODEL_NAME").unwrap_or_else(|_| provider.default_model().to_string()),
                api_key,
                base_url: env::var("OPENAI_BASE_URL").unwrap_or(default.model.base_url),
                timeout: parse_env("MODEL_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(default.model.timeout),
            },

            ocr: OcrConfig {
                binary: env::var("TESSERACT_BIN").unwrap_or(default.ocr.binary),
                language: env::var("OCR_LANGUAGE").unwrap_or(default.ocr.language),
                timeout: parse_env("OCR_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(default.ocr.timeout),
            },

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES").unwrap_or(default.max_upload_bytes),

            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Multipart framing adds overhead on top of the file itself, so the
    /// request body limit sits a little above the upload limit.
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes + 1024 * 1024
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.port, 3000);
        assert_eq!(config.model.provider, ModelProvider::Gemini);
        assert_eq!(config.model.name, "gemini-2.5-flash");
        assert!(config.mongo_uri.is_none());
        assert!(config.uses_default_secret());
    }

    #[test]
    fn test_body_limit_exceeds_upload_limit() {
        let config = Config::default();
        assert!(config.body_limit() > config.max_upload_bytes);
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!("Gemini".parse::<ModelProvider>(), Ok(ModelProvider::Gemini));
        assert_eq!("openai".parse::<ModelProvider>(), Ok(ModelProvider::OpenAi));
        assert!("llama".parse::<ModelProvider>().is_err());
    }
}
