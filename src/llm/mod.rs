//! Chat-completion gateway. The provider trait keeps handlers independent of
//! the upstream API; the one real implementation speaks the OpenAI
//! chat-completions protocol.

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::shared::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One instruction/message exchange; returns the assistant's text.
    async fn complete(
        &self,
        instruction: &str,
        message: &str,
        max_tokens: u32,
    ) -> Result<String, ApiError>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn complete(
        &self,
        instruction: &str,
        message: &str,
        max_tokens: u32,
    ) -> Result<String, ApiError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": instruction },
                { "role": "user", "content": message },
            ],
            "max_tokens": max_tokens,
        });
        debug!("chat completion request: model={}", self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("completion request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "completion request returned {}",
                response.status()
            )));
        }
        let payload: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("invalid completion response: {}", e)))?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Ok(text)
    }
}
