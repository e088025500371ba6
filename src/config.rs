//! Process configuration.
//!
//! [`ProviderConfig`] comes from environment variables and is loaded once at
//! startup. [`DigestConfig`] comes from an optional YAML file; every field has
//! a default, so running without a file collects from the two built-in Apple
//! news feeds.

use clap::ValueEnum;
use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_GROK_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GROK_BASE_URL: &str = "https://api.groq.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// `recent_hours` beyond a year is almost certainly a typo.
const MAX_RECENT_HOURS: i64 = 24 * 366;

/// Credentials and model ids for both providers.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Primary credential. When absent the primary fails fast and every call fails over.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub grok_api_key: String,
    pub grok_model: String,
    pub grok_base_url: String,
    pub request_timeout: Duration,
    /// Total primary attempts per story, including the first.
    pub max_attempts: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("grok_api_key", &"<redacted>")
            .field("grok_model", &self.grok_model)
            .field("grok_base_url", &self.grok_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl ProviderConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let grok_api_key = get("GROK_API_KEY").ok_or(ConfigError::MissingCredential("GROK_API_KEY"))?;

        let request_timeout = match get("LLM_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "LLM_REQUEST_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let max_attempts = match get("LLM_MAX_ATTEMPTS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "LLM_MAX_ATTEMPTS",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            grok_api_key,
            grok_model: get("GROK_MODEL").unwrap_or_else(|| DEFAULT_GROK_MODEL.to_string()),
            grok_base_url: get("GROK_BASE_URL").unwrap_or_else(|| DEFAULT_GROK_BASE_URL.to_string()),
            request_timeout,
            max_attempts,
        })
    }
}

/// How selected candidates are ordered before summarizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Newest first.
    #[default]
    Time,
    /// Shuffle the stories of the last three days, for variety between runs.
    Random,
}

/// What to collect and how to summarize it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub display_name: String,
    pub feeds: Vec<String>,
    pub keywords: Vec<String>,
    pub max_articles: usize,
    pub recent_hours: i64,
    pub selection_mode: SelectionMode,
    pub use_ai_ranking: bool,
    pub language: String,
    pub max_input_chars: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            display_name: "Apple".to_string(),
            feeds: vec![
                "https://9to5mac.com/feed/".to_string(),
                "https://feeds.macrumors.com/MacRumors-All".to_string(),
            ],
            keywords: Vec::new(),
            max_articles: 10,
            recent_hours: 48,
            selection_mode: SelectionMode::Time,
            use_ai_ranking: false,
            language: "Korean".to_string(),
            max_input_chars: 2000,
        }
    }
}

impl DigestConfig {
    pub fn from_yaml_str(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_RECENT_HOURS).contains(&self.recent_hours) {
            return Err(ConfigError::InvalidValue {
                name: "recent_hours",
                value: self.recent_hours.to_string(),
            });
        }
        Ok(())
    }

    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_string(),
                source,
            })?;
        Self::from_yaml_str(&raw, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_grok_key_is_fatal() {
        let err = ProviderConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "g")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("GROK_API_KEY")));
    }

    #[test]
    fn test_empty_grok_key_is_fatal() {
        let err = ProviderConfig::from_lookup(lookup_from(&[("GROK_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("GROK_API_KEY")));
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = ProviderConfig::from_lookup(lookup_from(&[("GROK_API_KEY", "k")])).unwrap();
        assert_eq!(cfg.grok_model, DEFAULT_GROK_MODEL);
        assert_eq!(cfg.gemini_model, DEFAULT_GEMINI_MODEL);
        assert!(cfg.gemini_api_key.is_none());
        assert_eq!(cfg.request_timeout, Duration::from_secs(60));
        assert_eq!(cfg.max_attempts, 3);
    }

    #[test]
    fn test_overrides_applied() {
        let cfg = ProviderConfig::from_lookup(lookup_from(&[
            ("GROK_API_KEY", "k"),
            ("GROK_MODEL", "mixtral"),
            ("GEMINI_API_KEY", "g"),
            ("LLM_REQUEST_TIMEOUT_SECS", "5"),
            ("LLM_MAX_ATTEMPTS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.grok_model, "mixtral");
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("g"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_timeout_rejected() {
        let err = ProviderConfig::from_lookup(lookup_from(&[
            ("GROK_API_KEY", "k"),
            ("LLM_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = ProviderConfig::from_lookup(lookup_from(&[
            ("GROK_API_KEY", "k"),
            ("LLM_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "LLM_MAX_ATTEMPTS", .. }));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let cfg = ProviderConfig::from_lookup(lookup_from(&[
            ("GROK_API_KEY", "secret-grok"),
            ("GEMINI_API_KEY", "secret-gemini"),
        ]))
        .unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret"));
    }

    #[test]
    fn test_digest_config_partial_yaml() {
        let cfg = DigestConfig::from_yaml_str(
            "keywords: [iPhone, Vision Pro]\nmax_articles: 3\n",
            "test.yaml",
        )
        .unwrap();
        assert_eq!(cfg.keywords, vec!["iPhone", "Vision Pro"]);
        assert_eq!(cfg.max_articles, 3);
        assert_eq!(cfg.feeds.len(), 2);
        assert_eq!(cfg.language, "Korean");
    }

    #[test]
    fn test_digest_config_selection_mode() {
        let cfg = DigestConfig::from_yaml_str("selection_mode: random\n", "test.yaml").unwrap();
        assert_eq!(cfg.selection_mode, SelectionMode::Random);
        assert_eq!(DigestConfig::default().selection_mode, SelectionMode::Time);
        assert!(DigestConfig::from_yaml_str("selection_mode: shuffle\n", "bad.yaml").is_err());
    }

    #[test]
    fn test_digest_config_rejects_out_of_range_recent_hours() {
        for bad in ["recent_hours: 0", "recent_hours: -5", "recent_hours: 9223372036854775807"] {
            let err = DigestConfig::from_yaml_str(bad, "bad.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { name: "recent_hours", .. }), "{bad}");
        }
    }

    #[test]
    fn test_digest_config_bad_yaml() {
        let err = DigestConfig::from_yaml_str("max_articles: lots", "bad.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
