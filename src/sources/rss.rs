//! RSS 2.0 feed fetching and parsing.
//!
//! Only the fields the digest needs are read: channel title, and each item's
//! `title`, `link`, `description` and `pubDate`. The HTML in `description`
//! is flattened to text.

use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, info, instrument};

use crate::models::NewsItem;
use crate::utils::host_name;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

/// Parse an RSS document into news items. Items without a title are skipped.
pub fn parse_feed(xml: &str) -> Result<Vec<NewsItem>, quick_xml::de::DeError> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    let channel_title = rss
        .channel
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let items = rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let title = item.title.map(|t| html_to_text(&t)).filter(|t| !t.is_empty())?;
            let link = item.link.map(|l| l.trim().to_string()).unwrap_or_default();
            let source_name = channel_title
                .clone()
                .or_else(|| host_name(&link))
                .unwrap_or_else(|| "unknown".to_string());
            Some(NewsItem {
                title,
                content: item.description.as_deref().map(html_to_text).unwrap_or_default(),
                published: item.pub_date.as_deref().and_then(parse_pub_date),
                link,
                source_name,
            })
        })
        .collect();

    Ok(items)
}

/// Parse an RFC 2822 `pubDate`.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Flatten an HTML fragment to whitespace-normalized text.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Download and parse one feed.
#[instrument(level = "info", skip(client))]
pub async fn fetch_feed(client: &Client, url: &str) -> Result<Vec<NewsItem>, Box<dyn Error>> {
    let body = client.get(url).send().await?.error_for_status()?.text().await?;
    debug!(bytes = body.len(), "Downloaded feed");
    let items = parse_feed(&body)?;
    info!(count = items.len(), "Parsed feed items");
    Ok(items)
}
