//! Resilient summarization: quota-aware retry on the primary provider, then
//! failover to the backup provider.
//!
//! ```text
//! Primary ──(quota error, attempts left: sleep hint)──▶ Primary
//! Primary ──(other error | attempts exhausted | hint too long)──▶ Backup
//! Backup  ──▶ Success(backup) | Failure(primary cause + backup cause)
//! ```
//!
//! Only the double failure leaves this module, as [`SummarizationFailed`].
//! Retries and the provider switch are logged, never returned.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::error::{ProviderError, SummarizationFailed};
use crate::models::{ProviderKind, ProviderRole, SummarizationRequest, SummarizationResult};
use crate::providers::SummarizationBackend;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::utils::truncate_chars;

/// Summaries are cut to this many lines.
pub const MAX_SUMMARY_LINES: usize = 5;

/// How prompts are phrased.
#[derive(Debug, Clone)]
pub struct PromptOptions {
    /// Subject of the digest, e.g. `"Apple"`.
    pub topic: String,
    /// Output language for summaries.
    pub language: String,
    /// Article bodies are truncated to this many characters.
    pub max_input_chars: usize,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            topic: "Apple".to_string(),
            language: "Korean".to_string(),
            max_input_chars: 2000,
        }
    }
}

/// Text returned by [`ResilientSummarizer::complete`] with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub provider: ProviderKind,
    pub role: ProviderRole,
}

/// Primary provider with bounded quota retries, backed by a fallback provider.
pub struct ResilientSummarizer<P, B, S = TokioSleeper> {
    primary: P,
    backup: B,
    policy: RetryPolicy,
    sleeper: S,
    prompt: PromptOptions,
}

impl<P, B> ResilientSummarizer<P, B, TokioSleeper>
where
    P: SummarizationBackend,
    B: SummarizationBackend,
{
    pub fn new(primary: P, backup: B) -> Self {
        Self::with_sleeper(primary, backup, TokioSleeper)
    }
}

impl<P, B, S> ResilientSummarizer<P, B, S>
where
    P: SummarizationBackend,
    B: SummarizationBackend,
    S: Sleeper,
{
    pub fn with_sleeper(primary: P, backup: B, sleeper: S) -> Self {
        Self {
            primary,
            backup,
            policy: RetryPolicy::default(),
            sleeper,
            prompt: PromptOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_prompt_options(mut self, prompt: PromptOptions) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn prompt_options(&self) -> &PromptOptions {
        &self.prompt
    }

    /// Summarize one article.
    ///
    /// Fails only when the primary path is exhausted and the backup fails too.
    #[instrument(level = "info", skip_all, fields(title = request.title.as_deref().unwrap_or("")))]
    pub async fn summarize(
        &self,
        request: &SummarizationRequest,
    ) -> Result<SummarizationResult, SummarizationFailed> {
        let prompt = build_summary_prompt(request, &self.prompt);
        let completion = self.complete(&prompt).await?;

        let cleaned = sanitize_summary(&completion.text, MAX_SUMMARY_LINES);
        let summary = if cleaned.is_empty() {
            completion.text.trim().to_string()
        } else {
            cleaned
        };

        Ok(SummarizationResult {
            summary,
            provider: completion.provider,
            role: completion.role,
        })
    }

    /// Run an arbitrary prompt through the same retry and failover path.
    pub async fn complete(&self, prompt: &str) -> Result<Completion, SummarizationFailed> {
        let total_t0 = Instant::now();

        let primary_err = match self.call_primary(prompt).await {
            Ok(text) => {
                return Ok(Completion {
                    text,
                    provider: self.primary.kind(),
                    role: ProviderRole::Primary,
                });
            }
            Err(e) => e,
        };

        warn!(
            primary = %self.primary.kind(),
            backup = %self.backup.kind(),
            error = %primary_err,
            "Primary provider gave up; switching to backup"
        );

        match self.backup.summarize(prompt).await {
            Ok(text) => {
                info!(
                    provider = %self.backup.kind(),
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    "Backup provider succeeded"
                );
                Ok(Completion {
                    text,
                    provider: self.backup.kind(),
                    role: ProviderRole::Backup,
                })
            }
            Err(backup_err) => {
                error!(
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    primary_error = %primary_err,
                    backup_error = %backup_err,
                    "Both providers failed"
                );
                Err(SummarizationFailed {
                    primary: primary_err,
                    backup: backup_err,
                })
            }
        }
    }

    /// Call the primary, waiting out quota errors up to `max_attempts` total calls.
    async fn call_primary(&self, prompt: &str) -> Result<String, ProviderError> {
        let max = self.policy.max_attempts.max(1);
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let attempt_t0 = Instant::now();
            let err = match self.primary.summarize(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if !err.is_rate_limited() {
                warn!(
                    attempt,
                    elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                    error = %err,
                    "Primary provider failed with a non-retryable error"
                );
                return Err(err);
            }

            if attempt >= max {
                warn!(attempt, max, error = %err, "Primary provider exhausted quota retries");
                return Err(err);
            }

            let Some(delay) = self.policy.backoff(attempt, err.retry_after()) else {
                warn!(
                    attempt,
                    hint = ?err.retry_after(),
                    max_delay = ?self.policy.max_delay,
                    error = %err,
                    "Primary provider asked for a longer wait than allowed; giving up"
                );
                return Err(err);
            };
            warn!(
                attempt,
                max,
                hinted = err.retry_after().is_some(),
                ?delay,
                error = %err,
                "Primary provider quota exceeded; backing off"
            );
            self.sleeper.sleep(delay).await;
        }
    }
}

/// Build the summarization prompt for one article.
pub fn build_summary_prompt(request: &SummarizationRequest, options: &PromptOptions) -> String {
    let mut prompt = format!(
        "Summarize the following {topic} news article in {language}, in at most {lines} short lines.\n\
Focus on figures, company and product names, and the key issue.\n\
Do not include URLs, source attributions or bullet symbols.\n\n",
        topic = options.topic,
        language = options.language,
        lines = MAX_SUMMARY_LINES,
    );

    if let Some(title) = request.title.as_deref() {
        prompt.push_str(&format!("Title: {title}\n"));
    }
    if let Some(url) = request.source_url.as_deref() {
        prompt.push_str(&format!("Source: {url}\n"));
    }
    prompt.push_str("Content:\n");
    prompt.push_str(truncate_chars(request.text.trim(), options.max_input_chars));
    prompt.push('\n');
    prompt
}

static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[•□▪◦·*\-]\s*|\d+[.)]\s+)").expect("valid regex"));
static ATTRIBUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:출처|source)\s*:").expect("valid regex"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://").expect("valid regex"));

/// Clean model output: drop blank, URL and attribution lines, strip bullet
/// markers and keep at most `max_lines` lines.
pub fn sanitize_summary(summary: &str, max_lines: usize) -> String {
    summary
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.contains("URL:"))
        .filter(|line| !ATTRIBUTION_RE.is_match(line))
        .filter(|line| !LINK_RE.is_match(line))
        .map(|line| BULLET_RE.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}
