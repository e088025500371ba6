//! # Apple News Digest
//!
//! A scheduled batch job that collects Apple news from RSS sources, summarizes
//! each story with an LLM and writes the result as a JSON digest.
//!
//! ## Features
//!
//! - Collects from 9to5Mac and MacRumors by default (configurable via YAML)
//! - Keyword and recency selection, optional LLM-assisted ranking
//! - Summarizes with Gemini; waits out quota errors using the provider's
//!   retry hint, then fails over to Groq
//! - Writes `{dir}/{date}/{edition}.json` and prints a plain-text digest
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... GROK_API_KEY=... apple_news_digest -j ./digest
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: provider credentials from env (fail fast without `GROK_API_KEY`)
//! 2. **Collection**: fetch feeds (or read `--input`) and select candidates
//! 3. **Summarization**: one story at a time through the resilient summarizer
//! 4. **Output**: stdout rendering and JSON digest

use chrono::{Local, Utc};
use clap::Parser;
use reqwest::Client;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod providers;
mod ranking;
mod retry;
mod sources;
mod summarizer;
mod utils;

use cli::Cli;
use config::{DigestConfig, ProviderConfig};
use models::{Digest, DigestEntry, ProviderRole};
use outputs::{json, text};
use providers::{GeminiClient, GroqClient, Provider};
use retry::RetryPolicy;
use summarizer::{PromptOptions, ResilientSummarizer};
use utils::{ensure_writable_dir, time_of_day};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("apple_news_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Provider config: fail before any network work ----
    let provider_config = match ProviderConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Provider configuration is incomplete");
            return Err(e.into());
        }
    };
    if provider_config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; every request will go to the backup provider");
    }
    info!(config = ?provider_config, "Loaded provider configuration");

    let mut digest_config = match &args.config {
        Some(path) => DigestConfig::load(path).await?,
        None => DigestConfig::default(),
    };
    args.apply_to(&mut digest_config);
    digest_config.validate()?;
    debug!(?digest_config, "Digest configuration");

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    let http = Client::builder()
        .timeout(provider_config.request_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    // ---- Collect ----
    let items = match &args.input {
        Some(path) => sources::load_items(path).await?,
        None => sources::fetch_all(&http, &digest_config.feeds).await,
    };
    let candidates = sources::select_items(
        items,
        &digest_config.keywords,
        digest_config.recent_hours,
        digest_config.selection_mode,
        Utc::now(),
    );
    info!(count = candidates.len(), "Selected candidate stories");

    // ---- Summarizer ----
    let summarizer = ResilientSummarizer::new(
        Provider::Gemini(GeminiClient::from_config(http.clone(), &provider_config)),
        Provider::Groq(GroqClient::from_config(http.clone(), &provider_config)),
    )
    .with_policy(RetryPolicy {
        max_attempts: provider_config.max_attempts,
        ..RetryPolicy::default()
    })
    .with_prompt_options(PromptOptions {
        topic: digest_config.display_name.clone(),
        language: digest_config.language.clone(),
        max_input_chars: digest_config.max_input_chars,
    });

    let selected = if digest_config.use_ai_ranking {
        ranking::rank_items(&summarizer, candidates, digest_config.max_articles).await
    } else {
        let mut c = candidates;
        c.truncate(digest_config.max_articles);
        c
    };

    // ---- Summarize, one story at a time ----
    let total = selected.len();
    let mut entries = Vec::with_capacity(total);
    let mut from_backup = 0usize;

    for (i, item) in selected.iter().enumerate() {
        debug!(index = i, title = %item.title, "Summarizing story");
        match summarizer.summarize(&item.to_request()).await {
            Ok(result) => {
                if result.role == ProviderRole::Backup {
                    from_backup += 1;
                }
                info!(index = i, provider = %result.provider, role = %result.role, "Summarized story");
                entries.push(DigestEntry::new(item, result));
            }
            Err(e) => {
                error!(
                    index = i,
                    link = %item.link,
                    primary = %e.primary.provider(),
                    backup = %e.backup.provider(),
                    error = %e,
                    "Summarization failed; skipping story"
                );
            }
        }
    }

    let failed = total - entries.len();
    info!(total, successful = entries.len(), failed, from_backup, "Completed summarization");

    let now = Local::now();
    let digest = Digest {
        display_name: digest_config.display_name.clone(),
        local_date: now.date_naive().to_string(),
        local_time: now.time().format("%H:%M:%S").to_string(),
        edition: time_of_day(),
        entries,
    };

    // ---- Output ----
    print!("{}", text::render_digest(&digest));

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_digest(&digest, dir).await {
            error!(error = %e, "Failed to write JSON digest");
            return Err(e);
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");

    if total > 0 && digest.entries.is_empty() {
        return Err(format!("all {total} summarizations failed").into());
    }
    Ok(())
}
