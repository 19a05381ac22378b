use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::backend::{CompletionBackend, DeltaStream, LlmError, Result};
use crate::protocol::{build_request_body, parse_stream_data, render_system_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::sse::delta_stream_from_sse;

/// How many additional attempts a server-side (5xx) failure is granted
/// before the error propagates.
const UPSTREAM_RETRIES: u32 = 2;

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the system instruction template. `{current_time}` is
    /// substituted per request.
    pub fn with_system_prompt(mut self, template: impl Into<String>) -> Self {
        self.system_prompt = template.into();
        self
    }

    async fn try_stream(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await?;
            return Err(LlmError::Api { status, message });
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn stream_chat(&self, history: &[String]) -> Result<DeltaStream> {
        debug_assert!(
            history.len() % 2 == 1,
            "conversation chain must end on a user turn"
        );

        let system_prompt = render_system_prompt(&self.system_prompt, Utc::now());
        let body = build_request_body(&self.model, &system_prompt, history);
        log::debug!(
            "completion request: model={}, turns={}",
            self.model,
            history.len()
        );

        let mut attempts = 0u32;
        let response = loop {
            match self.try_stream(&body).await {
                Ok(response) => break response,
                Err(error) if error.is_retryable() && attempts < UPSTREAM_RETRIES => {
                    attempts += 1;
                    log::warn!(
                        "completion request failed ({error}), retry {attempts}/{UPSTREAM_RETRIES}"
                    );
                }
                Err(error) => return Err(error),
            }
        };

        Ok(delta_stream_from_sse(response, parse_stream_data))
    }
}
