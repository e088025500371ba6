//! Command-line interface definitions.
//!
//! Provider credentials are read from the environment by
//! [`ProviderConfig`](crate::config::ProviderConfig), not from flags. The
//! flags here shape what gets collected and where the digest goes; each one
//! overrides the matching field of the YAML [`DigestConfig`].

use clap::Parser;

use crate::config::{DigestConfig, SelectionMode};

/// Collect Apple news and summarize each story.
///
/// # Examples
///
/// ```sh
/// # Fetch the default feeds, print the digest
/// apple_news_digest
///
/// # Write JSON and only keep iPhone/Vision Pro stories
/// apple_news_digest -j ./digest --keywords iPhone,"Vision Pro"
///
/// # Summarize items prepared by another tool
/// apple_news_digest --input items.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML digest config
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory for the JSON digest
    #[arg(short, long, env = "DIGEST_OUTPUT_DIR")]
    pub json_output_dir: Option<String>,

    /// JSON file of items to summarize instead of fetching feeds
    #[arg(short, long)]
    pub input: Option<String>,

    /// Maximum number of stories to summarize
    #[arg(short = 'n', long)]
    pub max_articles: Option<usize>,

    /// Language to write summaries in
    #[arg(short, long)]
    pub language: Option<String>,

    /// Comma-separated keywords; only matching stories are kept
    #[arg(long, env = "NEWS_KEYWORDS", value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Order candidates newest first (`time`) or shuffle recent ones (`random`)
    #[arg(long, env = "SELECTION_MODE", value_enum)]
    pub selection_mode: Option<SelectionMode>,

    /// Let the model choose the most important stories
    #[arg(long, env = "USE_AI_RANKING")]
    pub use_ai_ranking: bool,
}

impl Cli {
    /// Apply flag overrides on top of the file (or default) config.
    pub fn apply_to(&self, config: &mut DigestConfig) {
        if let Some(n) = self.max_articles {
            config.max_articles = n;
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if !self.keywords.is_empty() {
            config.keywords = self.keywords.clone();
        }
        if let Some(mode) = self.selection_mode {
            config.selection_mode = mode;
        }
        if self.use_ai_ranking {
            config.use_ai_ranking = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "apple_news_digest",
            "--json-output-dir",
            "./json",
            "--input",
            "items.json",
        ]);

        assert_eq!(cli.json_output_dir.as_deref(), Some("./json"));
        assert_eq!(cli.input.as_deref(), Some("items.json"));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["apple_news_digest", "-j", "/tmp/json", "-n", "3", "-l", "English"]);

        assert_eq!(cli.json_output_dir.as_deref(), Some("/tmp/json"));
        assert_eq!(cli.max_articles, Some(3));
        assert_eq!(cli.language.as_deref(), Some("English"));
    }

    #[test]
    fn test_keywords_split_on_commas() {
        let cli = Cli::parse_from(["apple_news_digest", "--keywords", "iPhone,Vision Pro"]);
        assert_eq!(cli.keywords, vec!["iPhone", "Vision Pro"]);
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from([
            "apple_news_digest",
            "-n",
            "4",
            "--keywords",
            "mac",
            "--use-ai-ranking",
        ]);
        let mut config = DigestConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.max_articles, 4);
        assert_eq!(config.keywords, vec!["mac"]);
        assert!(config.use_ai_ranking);
        assert_eq!(config.language, "Korean");
    }

    #[test]
    fn test_selection_mode_flag() {
        let cli = Cli::parse_from(["apple_news_digest", "--selection-mode", "random"]);
        let mut config = DigestConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.selection_mode, SelectionMode::Random);
        assert!(Cli::try_parse_from(["apple_news_digest", "--selection-mode", "shuffle"]).is_err());
    }
}
