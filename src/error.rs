//! Error taxonomy for configuration loading and provider calls.
//!
//! Only two errors ever leave the summarization path: [`ConfigError`] at
//! startup, and [`SummarizationFailed`] when both the primary and the backup
//! provider have given up. Everything else is a [`ProviderError`] that the
//! [`ResilientSummarizer`](crate::summarizer::ResilientSummarizer) absorbs
//! by retrying or failing over.

use std::time::Duration;
use thiserror::Error;

use crate::models::ProviderKind;

/// Failure of a single provider call.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Quota or rate limit hit. Transient; `retry_after` is the provider's hint.
    #[error("{provider} rate limited{}: {message}", fmt_hint(.retry_after))]
    RateLimited {
        provider: ProviderKind,
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider} returned an empty summary")]
    EmptyResponse { provider: ProviderKind },

    #[error("{provider} is not configured: {variable} is not set")]
    MissingCredential {
        provider: ProviderKind,
        variable: &'static str,
    },
}

fn fmt_hint(hint: &Option<Duration>) -> String {
    match hint {
        Some(d) => format!(" (retry in {:.1}s)", d.as_secs_f64()),
        None => String::new(),
    }
}

impl ProviderError {
    /// Whether the error is a transient quota failure worth waiting out.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// The provider-supplied wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::RateLimited { provider, .. }
            | ProviderError::Api { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Decode { provider, .. }
            | ProviderError::EmptyResponse { provider }
            | ProviderError::MissingCredential { provider, .. } => *provider,
        }
    }
}

/// Both providers failed. Carries the primary's last error and the backup's error.
#[derive(Error, Debug)]
#[error("summarization failed: primary ({primary}); backup ({backup})")]
pub struct SummarizationFailed {
    pub primary: ProviderError,
    pub backup: ProviderError,
}

/// Fatal startup errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
