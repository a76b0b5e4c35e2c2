// src/types.rs
//! Core data model for the digest pipeline.
//!
//! Lifecycle: `RawCandidate` is consumed by selection and not retained;
//! `RankedItem` picks up sentiment fields during enrichment and becomes an
//! `EnrichedItem`; a `Report` is assembled once per run and never mutated
//! after delivery.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// No search credential configured; discussion lookup never attempted.
pub const SENTIMENT_NO_API_KEY: &str = "no-API-key";
/// Discussion lookup succeeded but matched nothing.
pub const SENTIMENT_NO_DISCUSSION: &str = "no-discussion-found";
/// Discussion lookup failed (network/API error).
pub const SENTIMENT_FETCH_FAILED: &str = "fetch-failed";
/// Raw context was fetched but condensation failed; raw snippets are never
/// passed through uncondensed.
pub const SENTIMENT_SUMMARY_FAILED: &str = "summary-failed";

/// A raw article as supplied by a source adapter. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub url: String,
    /// Publishing outlet, e.g. "reuters.com".
    pub source: String,
    /// Display-oriented timestamp as supplied upstream (ISO date or RFC 2822).
    pub published_at: String,
    pub body_snippet: String,
}

/// A named group of raw candidates for one topic.
#[derive(Debug, Clone, Default)]
pub struct CategoryBucket {
    pub name: String,
    pub items: Vec<RawCandidate>,
}

impl CategoryBucket {
    pub fn new(name: impl Into<String>, items: Vec<RawCandidate>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A candidate that survived selection, with its score breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedItem {
    pub candidate: RawCandidate,
    /// Total score, non-negative. Heuristic scores are sums of capped
    /// sub-scores; delegated scores are positional.
    pub score: i32,
    /// Sub-score name → value, e.g. {"policy": 27, "jitter": 3}.
    pub rank_components: BTreeMap<String, i32>,
    /// Display title override supplied by a delegated ranker, if any.
    pub display_title: Option<String>,
    /// Light summary supplied by a delegated ranker, if any.
    pub display_summary: Option<String>,
}

impl RankedItem {
    pub fn from_candidate(candidate: RawCandidate, score: i32) -> Self {
        Self {
            candidate,
            score,
            rank_components: BTreeMap::new(),
            display_title: None,
            display_summary: None,
        }
    }

    /// Attach the sentiment commentary and finalize. An empty commentary is
    /// coerced to the `summary-failed` sentinel so the field is always
    /// populated downstream.
    pub fn into_enriched(self, sentiment_summary: String) -> EnrichedItem {
        let sentiment_summary = if sentiment_summary.trim().is_empty() {
            SENTIMENT_SUMMARY_FAILED.to_string()
        } else {
            sentiment_summary
        };
        let localized_title = self
            .display_title
            .unwrap_or_else(|| self.candidate.title.clone());
        let localized_summary = self
            .display_summary
            .unwrap_or_else(|| self.candidate.body_snippet.clone());
        EnrichedItem {
            title: self.candidate.title,
            url: self.candidate.url,
            source: self.candidate.source,
            published_at: self.candidate.published_at,
            score: self.score,
            rank_components: self.rank_components,
            localized_title,
            localized_summary,
            sentiment_summary,
        }
    }
}

/// A fully enriched item, ready for assembly and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: String,
    pub score: i32,
    pub rank_components: BTreeMap<String, i32>,
    pub localized_title: String,
    pub localized_summary: String,
    /// Always non-empty; a sentinel string when enrichment fell back.
    pub sentiment_summary: String,
}

/// Report body shape, fixed once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportBody {
    /// One global list, re-ranked across categories and capped.
    Merged(Vec<EnrichedItem>),
    /// Named sections in category order, no cross-category re-ranking.
    Sectioned(Vec<(String, Vec<EnrichedItem>)>),
}

/// Write-once digest produced by one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub body: ReportBody,
}

impl Report {
    /// Total item count across the body.
    pub fn len(&self) -> usize {
        match &self.body {
            ReportBody::Merged(items) => items.len(),
            ReportBody::Sectioned(sections) => sections.iter().map(|(_, v)| v.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run date used for the deterministic storage path.
    pub fn date_key(&self) -> String {
        self.generated_at.format("%Y-%m-%d").to_string()
    }
}

/// Output channels known to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    PushMessage,
    PersistFile,
    PersistAndPublish,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChannelKind::PushMessage => "push-message",
            ChannelKind::PersistFile => "persist-file",
            ChannelKind::PersistAndPublish => "persist-and-publish",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

/// Per-channel delivery outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub channel: ChannelKind,
    pub status: DeliveryStatus,
    /// File path, message target, or artifact URL the channel acted on.
    pub target_reference: Option<String>,
}

impl DeliveryReceipt {
    pub fn new(channel: ChannelKind, status: DeliveryStatus) -> Self {
        Self {
            channel,
            status,
            target_reference: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_reference = Some(target.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(title: &str) -> RawCandidate {
        RawCandidate {
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            source: "example.com".to_string(),
            published_at: "2026-08-29".to_string(),
            body_snippet: "snippet".to_string(),
        }
    }

    #[test]
    fn empty_sentiment_becomes_sentinel() {
        let item = RankedItem::from_candidate(cand("a"), 10);
        let enriched = item.into_enriched("   ".to_string());
        assert_eq!(enriched.sentiment_summary, SENTIMENT_SUMMARY_FAILED);
    }

    #[test]
    fn display_overrides_win_over_raw_fields() {
        let mut item = RankedItem::from_candidate(cand("a"), 10);
        item.display_title = Some("Cleaned title".to_string());
        item.display_summary = Some("Light summary".to_string());
        let enriched = item.into_enriched("calm".to_string());
        assert_eq!(enriched.localized_title, "Cleaned title");
        assert_eq!(enriched.localized_summary, "Light summary");
        assert_eq!(enriched.title, "a");
    }

    #[test]
    fn report_len_counts_all_sections() {
        let e = RankedItem::from_candidate(cand("a"), 1).into_enriched("ok".into());
        let report = Report {
            title: "t".into(),
            generated_at: Utc::now(),
            body: ReportBody::Sectioned(vec![
                ("finance".into(), vec![e.clone()]),
                ("ai".into(), vec![e.clone(), e]),
            ]),
        };
        assert_eq!(report.len(), 3);
    }
}
