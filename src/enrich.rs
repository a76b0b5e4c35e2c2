// src/enrich.rs
//! Per-item sentiment enrichment: look up community discussion for an item's
//! title, then condense it to one short commentary line.
//!
//! `enrich` is total. Every failure path lands on a sentinel string, so the
//! sentiment field is always populated and nothing propagates past this
//! component. Cost per item is at most two external calls (lookup +
//! condensation), with no batching across items.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;

use crate::llm::RankingBackend;
use crate::types::{
    EnrichedItem, RankedItem, SENTIMENT_FETCH_FAILED, SENTIMENT_NO_API_KEY,
    SENTIMENT_NO_DISCUSSION, SENTIMENT_SUMMARY_FAILED,
};

/// Discussion lookup is restricted to these domains.
pub const DISCUSSION_DOMAINS: &[&str] =
    &["reddit.com", "twitter.com", "x.com", "news.ycombinator.com"];

/// How many raw snippets to request per item.
pub const MAX_SNIPPETS: usize = 3;

#[async_trait]
pub trait DiscussionSource: Send + Sync {
    /// Text snippets matching `title` within the domain allow-list, possibly
    /// empty.
    async fn discussions(
        &self,
        title: &str,
        domains: &[String],
        max_results: usize,
    ) -> Result<Vec<String>>;
}

pub struct SentimentEnricher {
    discussions: Option<Arc<dyn DiscussionSource>>,
    condenser: Option<Arc<dyn RankingBackend>>,
    domains: Vec<String>,
}

impl SentimentEnricher {
    /// `discussions`/`condenser` are `None` when the respective credential is
    /// absent; the enricher then short-circuits to sentinels.
    pub fn new(
        discussions: Option<Arc<dyn DiscussionSource>>,
        condenser: Option<Arc<dyn RankingBackend>>,
    ) -> Self {
        Self {
            discussions,
            condenser,
            domains: DISCUSSION_DOMAINS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub async fn enrich(&self, item: RankedItem) -> EnrichedItem {
        let title = item.candidate.title.clone();
        let sentiment = self.sentiment_for(&title).await;
        item.into_enriched(sentiment)
    }

    /// Two-step lookup with terminal sentinels at every failure point. Raw
    /// context is never returned uncondensed.
    async fn sentiment_for(&self, title: &str) -> String {
        let Some(source) = &self.discussions else {
            counter!("scout_enrich_fallback_total").increment(1);
            return SENTIMENT_NO_API_KEY.to_string();
        };

        let snippets = match source.discussions(title, &self.domains, MAX_SNIPPETS).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = ?e, title, "discussion lookup failed");
                counter!("scout_enrich_fallback_total").increment(1);
                return SENTIMENT_FETCH_FAILED.to_string();
            }
        };
        if snippets.is_empty() {
            counter!("scout_enrich_fallback_total").increment(1);
            return SENTIMENT_NO_DISCUSSION.to_string();
        }

        let Some(condenser) = &self.condenser else {
            counter!("scout_enrich_fallback_total").increment(1);
            return SENTIMENT_SUMMARY_FAILED.to_string();
        };
        match condenser.condense(title, &snippets).await {
            Ok(line) if !line.trim().is_empty() => line,
            Ok(_) => {
                counter!("scout_enrich_fallback_total").increment(1);
                SENTIMENT_SUMMARY_FAILED.to_string()
            }
            Err(e) => {
                tracing::warn!(error = ?e, title, "sentiment condensation failed");
                counter!("scout_enrich_fallback_total").increment(1);
                SENTIMENT_SUMMARY_FAILED.to_string()
            }
        }
    }
}
