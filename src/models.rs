//! Data models shared across the pipeline.
//!
//! - [`NewsItem`]: a news story collected from a source feed (or an input file)
//! - [`SummarizationRequest`] / [`SummarizationResult`]: one summarizer call
//! - [`ProviderKind`] / [`ProviderRole`]: which backend produced a result
//! - [`Digest`] / [`DigestEntry`]: the run's output document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A news story as collected from a source.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// Plain-text body or teaser used as summarization input.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_name: String,
}

impl NewsItem {
    pub fn to_request(&self) -> SummarizationRequest {
        let mut request = SummarizationRequest::new(self.content.as_str());
        if !self.title.is_empty() {
            request = request.with_title(self.title.as_str());
        }
        if !self.link.is_empty() {
            request = request.with_source_url(self.link.as_str());
        }
        request
    }
}

/// Input to a single summarization.
///
/// `title` and `source_url` are forwarded verbatim into the prompt.
#[derive(Debug, Clone, Default)]
pub struct SummarizationRequest {
    pub text: String,
    pub title: Option<String>,
    pub source_url: Option<String>,
}

impl SummarizationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

/// The concrete backend behind a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Groq,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => f.write_str("gemini"),
            ProviderKind::Groq => f.write_str("groq"),
        }
    }
}

/// Whether a result came from the first-choice provider or the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    Primary,
    Backup,
}

impl fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderRole::Primary => f.write_str("primary"),
            ProviderRole::Backup => f.write_str("backup"),
        }
    }
}

/// A successful summarization. `summary` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizationResult {
    pub summary: String,
    pub provider: ProviderKind,
    pub role: ProviderRole,
}

/// One summarized story in the digest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DigestEntry {
    pub title: String,
    pub link: String,
    pub source_name: String,
    pub published: Option<DateTime<Utc>>,
    pub summary: String,
    pub provider: ProviderKind,
    pub role: ProviderRole,
}

impl DigestEntry {
    pub fn new(item: &NewsItem, result: SummarizationResult) -> Self {
        Self {
            title: item.title.clone(),
            link: item.link.clone(),
            source_name: item.source_name.clone(),
            published: item.published,
            summary: result.summary,
            provider: result.provider,
            role: result.role,
        }
    }
}

/// The output of one run.
///
/// # Edition Naming
///
/// `edition` is `"morning"` (00:00-08:00), `"afternoon"` (08:00-16:00) or
/// `"evening"` (16:00-24:00) in local time.
#[derive(Debug, Deserialize, Serialize)]
pub struct Digest {
    pub display_name: String,
    pub local_date: String,
    pub local_time: String,
    pub edition: String,
    pub entries: Vec<DigestEntry>,
}
