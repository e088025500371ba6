//! Google Gemini `generateContent` client (primary provider).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, instrument, warn};

use super::{SummarizationBackend, error_from_response};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::models::ProviderKind;

const PROVIDER: ProviderKind = ProviderKind::Gemini;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    #[serde(default)]
    text: String,
}

/// Gemini API client.
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        client: Client,
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(client: Client, config: &ProviderConfig) -> Self {
        Self::new(
            client,
            config.gemini_api_key.clone(),
            &config.gemini_model,
            &config.gemini_base_url,
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        )
    }
}

impl SummarizationBackend for GeminiClient {
    fn kind(&self) -> ProviderKind {
        PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(provider = %PROVIDER, model = %self.model))]
    async fn summarize(&self, prompt: &str) -> Result<String, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::MissingCredential {
                provider: PROVIDER,
                variable: "GEMINI_API_KEY",
            });
        };

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let t0 = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        if !response.status().is_success() {
            let err = error_from_response(PROVIDER, response).await;
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %err, "Gemini call failed");
            return Err(err);
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| ProviderError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        let text = text.trim();

        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, bytes = text.len(), "Gemini responded");
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn client_for(server: &MockServer, key: Option<&str>) -> GeminiClient {
        GeminiClient::new(Client::new(), key.map(str::to_string), "gemini-test", server.uri())
    }

    #[tokio::test]
    async fn test_success_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(json!({"contents": [{"parts": [{"text": "hello"}]}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Line one\n"}, {"text": "Line two\n"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server, Some("g-key")).summarize("hello").await.unwrap();
        assert_eq!(text, "Line one\nLine two");
    }

    #[tokio::test]
    async fn test_quota_maps_to_rate_limited_with_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": 429,
                    "message": "You exceeded your current quota. Please retry in 30s.",
                    "status": "RESOURCE_EXHAUSTED",
                    "details": [{"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "30s"}]
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("g-key")).summarize("hello").await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_retry_after_header_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "9")
                    .set_body_string("slow down"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, Some("g-key")).summarize("hello").await.unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(9)));
    }

    #[tokio::test]
    async fn test_server_error_is_not_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("bad")).summarize("hello").await.unwrap_err();
        match err {
            ProviderError::Api { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("g-key")).summarize("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, None).summarize("hello").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredential { variable: "GEMINI_API_KEY", .. }
        ));
    }
}
