//! Summarization backends.
//!
//! Every backend implements [`SummarizationBackend`]: take a prompt, return
//! text. [`Provider`] is the closed set of backends the binary can be wired
//! with; supporting another API means adding a module and a variant here.
//!
//! | Backend | Module | Role |
//! |---------|--------|------|
//! | Google Gemini | [`gemini`] | primary (quota-limited) |
//! | Groq chat completions | [`groq`] | backup |

pub mod gemini;
pub mod groq;

pub use gemini::GeminiClient;
pub use groq::GroqClient;

use reqwest::Response;

use crate::error::ProviderError;
use crate::models::ProviderKind;
use crate::retry::{parse_retry_after_header, parse_retry_hint};

/// Capability shared by all summarization backends.
pub trait SummarizationBackend {
    fn kind(&self) -> ProviderKind;

    /// Send a prompt and return the model's text. Empty text is an error.
    async fn summarize(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// The configured backends.
#[derive(Debug)]
pub enum Provider {
    Gemini(GeminiClient),
    Groq(GroqClient),
}

impl SummarizationBackend for Provider {
    fn kind(&self) -> ProviderKind {
        match self {
            Provider::Gemini(c) => c.kind(),
            Provider::Groq(c) => c.kind(),
        }
    }

    async fn summarize(&self, prompt: &str) -> Result<String, ProviderError> {
        match self {
            Provider::Gemini(c) => c.summarize(prompt).await,
            Provider::Groq(c) => c.summarize(prompt).await,
        }
    }
}

impl<T: SummarizationBackend> SummarizationBackend for &T {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    async fn summarize(&self, prompt: &str) -> Result<String, ProviderError> {
        (**self).summarize(prompt).await
    }
}

/// Turn a non-success HTTP response into a [`ProviderError`].
///
/// 429s, and bodies whose status is `RESOURCE_EXHAUSTED`, become
/// [`ProviderError::RateLimited`] with whatever wait hint the response carries.
pub(crate) async fn error_from_response(provider: ProviderKind, response: Response) -> ProviderError {
    let status = response.status();
    let header_hint = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after_header);

    let body = match response.text().await {
        Ok(body) => body,
        Err(source) => return ProviderError::Transport { provider, source },
    };

    let message = error_message(&body);
    let exhausted = body.contains("RESOURCE_EXHAUSTED");

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || exhausted {
        ProviderError::RateLimited {
            provider,
            retry_after: header_hint.or_else(|| parse_retry_hint(&body)),
            message,
        }
    } else {
        ProviderError::Api {
            provider,
            status: status.as_u16(),
            message,
        }
    }
}

/// Pull `error.message` out of a JSON error body, or fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| crate::utils::truncate_for_log(body.trim(), 300))
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-process backends that replay a fixed script of outcomes.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    pub enum Step {
        Ok(&'static str),
        Quota(Option<u64>),
        Fail(&'static str),
    }

    pub struct ScriptedBackend {
        kind: ProviderKind,
        steps: Mutex<VecDeque<Step>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        pub fn new(kind: ProviderKind, steps: Vec<Step>) -> Self {
            Self {
                kind,
                steps: Mutex::new(steps.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl SummarizationBackend for ScriptedBackend {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn summarize(&self, prompt: &str) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted backend ran out of steps");
            match step {
                Step::Ok(text) => Ok(text.to_string()),
                Step::Quota(secs) => Err(ProviderError::RateLimited {
                    provider: self.kind,
                    retry_after: secs.map(Duration::from_secs),
                    message: "quota exceeded".to_string(),
                }),
                Step::Fail(msg) => Err(ProviderError::Api {
                    provider: self.kind,
                    status: 500,
                    message: msg.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"error": {"message": "Invalid API key", "code": 401}}"#),
            "Invalid API key"
        );
        assert_eq!(error_message("  upstream down \n"), "upstream down");
    }
}
