// src/select/mod.rs
//! Per-category selection: reduce a raw bucket to a bounded ranked top-N.
//! Two strategies behind one contract — local keyword scoring or a
//! delegated ranking call.

pub mod delegated;
pub mod heuristic;

use async_trait::async_trait;

use crate::types::{CategoryBucket, RankedItem};

/// Selection contract. Total: strategies degrade to an empty result on
/// failure instead of erroring. The returned sequence is at most `limit`
/// long, sorted descending by score (stable, preserving bucket order among
/// ties), with no duplicate URLs.
#[async_trait]
pub trait Selector: Send + Sync {
    async fn select(&self, bucket: &CategoryBucket, limit: usize) -> Vec<RankedItem>;
    fn name(&self) -> &'static str;
}

/// First-seen URL dedup, preserving order.
pub(crate) fn dedup_by_url(items: Vec<RankedItem>) -> Vec<RankedItem> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|it| seen.insert(it.candidate.url.clone()))
        .collect()
}
