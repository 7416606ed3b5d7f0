use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ModelInvoker, SummaryError};
use crate::config::ModelConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model invoker backed by the Anthropic Messages API.
///
/// Without an API key every call fails with `SummarizationUnavailable`, so
/// the report is still produced with each summary marked unavailable.
pub struct AnthropicInvoker {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl AnthropicInvoker {
    pub fn new(config: &ModelConfig, timeout: std::time::Duration) -> Result<Self, SummaryError> {
        if config.api_key.is_none() {
            warn!("model API key not found (set ANTHROPIC_API_KEY); summaries will be unavailable");
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("bug-aging-report")
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }
}

#[async_trait]
impl ModelInvoker for AnthropicInvoker {
    async fn invoke(&self, prompt: &str) -> Result<String, SummaryError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            SummaryError::SummarizationUnavailable(
                "model API key not found (set ANTHROPIC_API_KEY)".to_string(),
            )
        })?;
        debug!(model = %self.model, prompt_chars = prompt.len(), "invoking model");
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(SummaryError::SummarizationUnavailable(format!(
                "model service returned {}: {message}",
                status.as_u16()
            )));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            SummaryError::SummarizationUnavailable(format!("unreadable model response: {e}"))
        })?;
        Ok(parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<String>())
    }
}
