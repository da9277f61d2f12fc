use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::gemini;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelProvider};

/// A hosted generative-text model: one prompt in, one reply out.
#[async_trait]
pub trait TextModel: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, prompt: &str) -> Result<String>;
}

pub fn from_config(config: &ModelConfig) -> Result<Arc<dyn TextModel>> {
    let api_key = config.api_key.as_deref().with_context(|| match config.provider {
        ModelProvider::Gemini => "GEMINI_API_KEY not set",
        ModelProvider::OpenAi => "OPENAI_API_KEY not set",
    })?;

    let model: Arc<dyn TextModel> = match config.provider {
        ModelProvider::Gemini => Arc::new(GeminiModel::new(api_key, &config.name)?),
        ModelProvider::OpenAi => Arc::new(OpenAiModel::new(
            reqwest::Client::new(),
            api_key,
            &config.name,
            &config.base_url,
        )),
    };

    tracing::info!("Analysis model: {}", model.name());
    Ok(model)
}

pub struct GeminiModel {
    client: gemini::Client,
    model: String,
}

impl GeminiModel {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let client = gemini::Client::new(api_key)?;
        Ok(Self {
            client,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        let agent = self.client.agent(self.model.as_str()).build();
        let reply = agent
            .prompt(prompt.to_string())
            .await
            .context("Gemini completion failed")?;
        Ok(reply)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

/// Any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiModel {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiModel {
    pub fn new(http_client: reqwest::Client, api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            http_client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TextModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        let req_body = OpenAiChatRequest {
            model: self.model.clone(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.2,
        };

        let res = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req_body)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!("OpenAI error {}: {}", status, body));
        }

        let parsed: OpenAiChatResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow::anyhow!("Failed to parse OpenAI response: {} | body: {}", e, body))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenAI returned no choices"))
    }
}
