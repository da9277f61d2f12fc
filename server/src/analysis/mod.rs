pub mod lenient;
pub mod model;
pub mod parse;
pub mod prompts;
pub mod types;

pub use model::TextModel;
pub use parse::{ParseTier, ParsedResponse, parse_model_response, strip_code_fences};
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::request_counter::{InvocationKind, RequestCounter};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("model invocation failed: {0}")]
    Invocation(String),

    #[error("model did not answer within {0:?}")]
    Timeout(Duration),
}

/// Prompts the configured model and reads its replies into fixed shapes.
///
/// Invocation failures and timeouts are returned to the caller; malformed
/// replies never are.
pub struct AnalysisClient {
    model: Arc<dyn TextModel>,
    timeout: Duration,
    counter: RequestCounter,
}

impl AnalysisClient {
    pub fn new(model: Arc<dyn TextModel>, timeout: Duration) -> Self {
        Self {
            model,
            timeout,
            counter: RequestCounter::new(),
        }
    }

    pub fn counter(&self) -> &RequestCounter {
        &self.counter
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    async fn invoke(&self, kind: InvocationKind, prompt: &str) -> Result<String, AnalysisError> {
        self.counter.log_request(kind, self.model.name());

        match tokio::time::timeout(self.timeout, self.model.invoke(prompt)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(AnalysisError::Invocation(format!("{:#}", e))),
            Err(_) => Err(AnalysisError::Timeout(self.timeout)),
        }
    }

    pub async fn analyze_document(
        &self,
        text: &str,
        question: Option<&str>,
    ) -> Result<ParsedResponse<DocumentReport>, AnalysisError> {
        let prompt = prompts::document_prompt(text, question);
        let reply = self.invoke(InvocationKind::Document, &prompt).await?;

        let parsed = parse_model_response::<DocumentReport>(&reply);
        log_tier("document analysis", parsed.tier());
        Ok(parsed)
    }

    pub async fn analyze_health_condition(
        &self,
        input: &HealthInput,
    ) -> Result<ParsedResponse<ClinicalAssessment>, AnalysisError> {
        let prompt = prompts::health_condition_prompt(input);
        let reply = self.invoke(InvocationKind::Clinical, &prompt).await?;

        let parsed = parse_model_response::<ClinicalAssessment>(&reply);
        log_tier("health analysis", parsed.tier());
        Ok(parsed)
    }

    pub async fn chat(&self, message: &str) -> Result<String, AnalysisError> {
        self.invoke(InvocationKind::Chat, &prompts::chat_prompt(message))
            .await
    }
}

fn log_tier(operation: &str, tier: ParseTier) {
    match tier {
        ParseTier::Parsed => tracing::debug!("{} reply parsed", operation),
        ParseTier::Recovered => {
            tracing::warn!("{} reply was not clean JSON, recovered the embedded object", operation)
        }
        ParseTier::Fallback => {
            tracing::error!("{} reply could not be parsed, using safe default", operation)
        }
    }
}
