//! News collection from RSS sources.
//!
//! Collection happens in two steps:
//!
//! 1. **Fetching**: download every configured feed ([`fetch_all`]); a failing
//!    feed is logged and skipped
//! 2. **Selection**: keyword filter, de-duplication by link, recency window
//!    and newest-first or shuffled ordering ([`select_items`])

pub mod rss;

use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use rand::{rng, seq::SliceRandom};
use reqwest::Client;
use std::error::Error;
use tracing::{error, info, instrument};

use crate::config::SelectionMode;
use crate::models::NewsItem;
use crate::utils::host_name;

/// The recency window is only applied when it keeps at least this many items.
pub const MIN_RECENT_ITEMS: usize = 5;

/// Random selection draws from stories published within this many hours.
pub const RANDOM_WINDOW_HOURS: i64 = 72;

/// Fetch all feeds one after another, skipping failures.
#[instrument(level = "info", skip_all, fields(feeds = feeds.len()))]
pub async fn fetch_all(client: &Client, feeds: &[String]) -> Vec<NewsItem> {
    let per_feed: Vec<Vec<NewsItem>> = stream::iter(feeds)
        .then(|url| async move {
            match rss::fetch_feed(client, url).await {
                Ok(items) => items,
                Err(e) => {
                    error!(error = %e, %url, "Feed fetch failed");
                    Vec::new()
                }
            }
        })
        .collect()
        .await;

    let items: Vec<NewsItem> = per_feed.into_iter().flatten().collect();
    info!(count = items.len(), "Fetched news items");
    items
}

/// Parse items handed over as a JSON array instead of fetched from feeds.
///
/// Missing `source_name`s are filled from the link host.
pub fn parse_items_json(json: &str) -> Result<Vec<NewsItem>, serde_json::Error> {
    let mut items: Vec<NewsItem> = serde_json::from_str(json)?;
    for item in items.iter_mut().filter(|i| i.source_name.is_empty()) {
        item.source_name = host_name(&item.link).unwrap_or_else(|| "unknown".to_string());
    }
    Ok(items)
}

/// Read a JSON items file (see [`parse_items_json`]).
#[instrument(level = "info")]
pub async fn load_items(path: &str) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let items = parse_items_json(&raw)?;
    info!(count = items.len(), "Loaded news items from file");
    Ok(items)
}

/// Narrow collected items down to the candidates worth summarizing.
///
/// - Keep items whose title or content mentions any keyword (case-insensitive);
///   with no keywords everything is kept.
/// - Drop repeated links, keeping the first occurrence.
/// - Keep only items published within `recent_hours` of `now`, unless that
///   leaves fewer than [`MIN_RECENT_ITEMS`], in which case keep them all.
/// - [`SelectionMode::Time`]: order newest first; undated items go last.
/// - [`SelectionMode::Random`]: shuffle the stories of the last
///   [`RANDOM_WINDOW_HOURS`], or all of them when none are that recent.
pub fn select_items(
    items: Vec<NewsItem>,
    keywords: &[String],
    recent_hours: i64,
    mode: SelectionMode,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let matched: Vec<NewsItem> = items
        .into_iter()
        .filter(|item| {
            if keywords.is_empty() {
                return true;
            }
            let haystack = format!("{} {}", item.title, item.content).to_lowercase();
            keywords.iter().any(|k| haystack.contains(k.as_str()))
        })
        .unique_by(|item| {
            if item.link.is_empty() {
                item.title.clone()
            } else {
                item.link.clone()
            }
        })
        .collect();

    let recent = published_since(&matched, recent_hours, now);
    let mut selected = if recent.len() >= MIN_RECENT_ITEMS {
        recent
    } else {
        matched
    };

    match mode {
        SelectionMode::Time => {
            selected.sort_by(|a, b| b.published.cmp(&a.published));
            selected
        }
        SelectionMode::Random => {
            let pool = published_since(&selected, RANDOM_WINDOW_HOURS, now);
            let mut pool = if pool.is_empty() { selected } else { pool };
            pool.shuffle(&mut rng());
            pool
        }
    }
}

/// Items published within `hours` of `now`. An out-of-range window keeps every dated item.
fn published_since(items: &[NewsItem], hours: i64, now: DateTime<Utc>) -> Vec<NewsItem> {
    let cutoff = TimeDelta::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    items
        .iter()
        .filter(|item| item.published.is_some_and(|p| p >= cutoff))
        .cloned()
        .collect()
}
