//! Groq OpenAI-compatible chat completions client (backup provider).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, instrument, warn};

use super::{SummarizationBackend, error_from_response};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::models::ProviderKind;

const PROVIDER: ProviderKind = ProviderKind::Groq;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Groq API client.
pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GroqClient {
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(client: Client, config: &ProviderConfig) -> Self {
        Self::new(
            client,
            &config.grok_api_key,
            &config.grok_model,
            &config.grok_base_url,
        )
    }
}

impl SummarizationBackend for GroqClient {
    fn kind(&self) -> ProviderKind {
        PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(provider = %PROVIDER, model = %self.model))]
    async fn summarize(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let t0 = Instant::now();
        let response = self
            .client
            .post(format!("{}/openai/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        if !response.status().is_success() {
            let err = error_from_response(PROVIDER, response).await;
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %err, "Groq call failed");
            return Err(err);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ProviderError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let text = text.trim();

        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, bytes = text.len(), "Groq responded");
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text.to_string())
    }
}
