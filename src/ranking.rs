//! LLM-assisted headline ranking.
//!
//! The model is shown the newest candidates as a numbered list and asked for
//! the indices of the most significant ones. Whatever it answers, the result
//! is padded back up to `limit` in time order, and any provider failure falls
//! back to plain time order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

use crate::models::NewsItem;
use crate::providers::SummarizationBackend;
use crate::retry::Sleeper;
use crate::summarizer::ResilientSummarizer;

/// Only this many of the newest items are offered to the model.
pub const MAX_RANKING_CANDIDATES: usize = 60;

static INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

pub fn build_ranking_prompt(candidates: &[NewsItem], topic: &str, limit: usize) -> String {
    let list = candidates
        .iter()
        .enumerate()
        .map(|(idx, item)| format!("{idx}. {}", item.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Below is a numbered list of {topic} news headlines.\n\
Pick the {limit} most important and meaningful stories for today's newsletter.\n\n\
Prefer:\n\
1. New product or platform launches and major software releases\n\
2. Significant business, legal or regulatory developments\n\
3. Notable research, security or supply-chain news\n\
Skip tutorials, deals and promotional posts.\n\n\
Answer with the index numbers only, most important first, separated by commas (e.g. 1, 5, 10, 3).\n\n\
[Headlines]\n{list}\n"
    )
}

/// Pick `limit` candidates, taking the model's `answer` order first.
pub fn apply_ranking(candidates: Vec<NewsItem>, answer: &str, limit: usize) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    let mut order: Vec<usize> = INDEX_RE
        .find_iter(answer)
        .filter_map(|m| m.as_str().parse::<usize>().ok())
        .filter(|idx| *idx < candidates.len() && seen.insert(*idx))
        .collect();

    for idx in 0..candidates.len() {
        if order.len() >= limit {
            break;
        }
        if seen.insert(idx) {
            order.push(idx);
        }
    }
    order.truncate(limit);

    let mut slots: Vec<Option<NewsItem>> = candidates.into_iter().map(Some).collect();
    order.into_iter().filter_map(|idx| slots[idx].take()).collect()
}

/// Rank items (already newest first) and keep the best `limit`.
#[instrument(level = "info", skip_all, fields(items = items.len(), limit = limit))]
pub async fn rank_items<P, B, S>(
    summarizer: &ResilientSummarizer<P, B, S>,
    mut items: Vec<NewsItem>,
    limit: usize,
) -> Vec<NewsItem>
where
    P: SummarizationBackend,
    B: SummarizationBackend,
    S: Sleeper,
{
    if items.is_empty() || limit == 0 {
        return Vec::new();
    }
    items.truncate(MAX_RANKING_CANDIDATES);

    let prompt = build_ranking_prompt(&items, &summarizer.prompt_options().topic, limit);
    match summarizer.complete(&prompt).await {
        Ok(completion) => {
            info!(provider = %completion.provider, role = %completion.role, "Ranked headlines");
            apply_ranking(items, &completion.text, limit)
        }
        Err(e) => {
            warn!(error = %e, "Ranking failed; falling back to time order");
            items.truncate(limit);
            items
        }
    }
}
