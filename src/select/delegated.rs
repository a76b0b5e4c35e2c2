// src/select/delegated.rs
//! Delegated selection: ship the whole raw bucket plus a category policy to
//! the ranking backend and trust it to filter and lightly summarize.
//!
//! Fails closed: a failed call or malformed payload degrades the category to
//! an empty selection. There is no silent fallback to unranked data.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;

use crate::llm::{RankRequest, RankingBackend};
use crate::select::{dedup_by_url, Selector};
use crate::types::{CategoryBucket, RankedItem, RawCandidate};

pub struct DelegatedSelector {
    backend: Arc<dyn RankingBackend>,
}

impl DelegatedSelector {
    pub fn new(backend: Arc<dyn RankingBackend>) -> Self {
        Self { backend }
    }
}

/// Textual selection criteria per category, handed to the ranking service.
pub fn selection_policy(category: &str) -> &'static str {
    match category {
        "finance" => {
            "- Finance: only macro events, broad indices, major geopolitics, and heavyweight \
             corporate moves. Exclude clickbait forecasts and small/mid caps."
        }
        "ai" => {
            "- AI: model breakthroughs, compute infrastructure, major M&A and funding, real \
             deployments. Exclude minor tool updates and tutorial content."
        }
        _ => "- Keep items with broad market or industry impact; drop promotional noise.",
    }
}

#[async_trait]
impl Selector for DelegatedSelector {
    async fn select(&self, bucket: &CategoryBucket, limit: usize) -> Vec<RankedItem> {
        let req = RankRequest {
            category: &bucket.name,
            policy: selection_policy(&bucket.name),
            candidates: &bucket.items,
            target: limit,
        };

        let selected = match self.backend.rank(req).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    category = %bucket.name,
                    backend = self.backend.name(),
                    error = ?e,
                    "delegated ranking failed; degrading category to empty"
                );
                counter!("scout_selection_failures_total").increment(1);
                return Vec::new();
            }
        };

        let ranked = selected
            .into_iter()
            .enumerate()
            .map(|(idx, it)| {
                // Positional score: the service already ordered by importance.
                let score = (limit.saturating_sub(idx)) as i32;
                let mut item = RankedItem::from_candidate(
                    RawCandidate {
                        title: it.title.clone(),
                        url: it.url,
                        source: it.source,
                        published_at: it.published_at,
                        body_snippet: String::new(),
                    },
                    score,
                );
                item.rank_components
                    .insert("delegated_rank".into(), (idx + 1) as i32);
                item.display_title = Some(it.title);
                if !it.summary.trim().is_empty() {
                    item.display_summary = Some(it.summary);
                }
                item
            })
            .collect();

        let mut out = dedup_by_url(ranked);
        out.truncate(limit);
        out
    }

    fn name(&self) -> &'static str {
        "delegated"
    }
}
