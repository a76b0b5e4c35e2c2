// src/select/heuristic.rs
//! Keyword-lexicon scorer. Four topic lexicons (policy, systemic risk, AI,
//! social virality), each sub-score independently capped; the total is the
//! sum of capped sub-scores plus a small random jitter on the social side.
//!
//! The jitter is a documented, accepted nondeterminism: it breaks ties
//! between keyword-identical items so the daily top list does not ossify.
//! The randomness source is seedable so tests can pin it.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;

use crate::select::{dedup_by_url, Selector};
use crate::types::{CategoryBucket, RankedItem, RawCandidate};

/// Upper bound of the jitter added to the social sub-score. Total score
/// range is therefore [0, 100 + JITTER_MAX].
pub const JITTER_MAX: i32 = 5;

#[derive(Debug, Deserialize)]
struct Topic {
    cap: i32,
    terms: HashMap<String, i32>,
}

#[derive(Debug, Deserialize)]
struct LexiconFile {
    policy: Topic,
    systemic: Topic,
    ai: Topic,
    social: Topic,
}

static LEXICONS: Lazy<LexiconFile> = Lazy::new(|| {
    toml::from_str(include_str!("../../config/lexicons.toml")).expect("valid lexicon config")
});

pub struct HeuristicSelector {
    rng: Mutex<StdRng>,
}

impl Default for HeuristicSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicSelector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Fixed seed for deterministic runs (tests, replays).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn score(&self, candidate: &RawCandidate) -> RankedItem {
        let text = format!("{} {}", candidate.title, candidate.body_snippet).to_lowercase();
        let tokens = tokenize(&text);

        let policy = topic_score(&LEXICONS.policy, &text, &tokens);
        let systemic = topic_score(&LEXICONS.systemic, &text, &tokens);
        let ai = topic_score(&LEXICONS.ai, &text, &tokens);
        let social = topic_score(&LEXICONS.social, &text, &tokens);
        let jitter = self
            .rng
            .lock()
            .expect("poisoned jitter rng")
            .random_range(0..=JITTER_MAX);

        let mut item =
            RankedItem::from_candidate(candidate.clone(), policy + systemic + ai + social + jitter);
        item.rank_components.insert("policy".into(), policy);
        item.rank_components.insert("systemic".into(), systemic);
        item.rank_components.insert("ai".into(), ai);
        item.rank_components.insert("social".into(), social);
        item.rank_components.insert("jitter".into(), jitter);
        item
    }
}

#[async_trait]
impl Selector for HeuristicSelector {
    async fn select(&self, bucket: &CategoryBucket, limit: usize) -> Vec<RankedItem> {
        let mut ranked: Vec<RankedItem> =
            dedup_by_url(bucket.items.iter().map(|c| self.score(c)).collect());
        // Stable sort keeps bucket order among equal scores.
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(limit);
        ranked
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Presence-weighted topic score, capped. A term contributes its weight once
/// no matter how often it repeats; multi-word terms match as substrings.
fn topic_score(topic: &Topic, text: &str, tokens: &HashSet<String>) -> i32 {
    let mut score = 0;
    for (term, weight) in &topic.terms {
        let hit = if term.contains(' ') {
            text.contains(term.as_str())
        } else {
            tokens.contains(term.as_str())
        };
        if hit {
            score += weight;
        }
    }
    score.min(topic.cap)
}

fn tokenize(text: &str) -> HashSet<String> {
    static RE: Lazy<regex::Regex> =
        Lazy::new(|| regex::Regex::new(r"(?u)\b\w+\b").expect("tokenizer regex"));
    RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(title: &str, snippet: &str, url: &str) -> RawCandidate {
        RawCandidate {
            title: title.to_string(),
            url: url.to_string(),
            source: "test".to_string(),
            published_at: String::new(),
            body_snippet: snippet.to_string(),
        }
    }

    #[test]
    fn sub_scores_are_capped_regardless_of_repetition() {
        let sel = HeuristicSelector::with_seed(7);
        let spam = "fed rate tariff inflation treasury ecb stimulus ".repeat(50);
        let item = sel.score(&cand("Policy storm", &spam, "https://x/1"));
        assert_eq!(item.rank_components["policy"], 30);
        assert!(item.rank_components["systemic"] <= 25);
        assert!(item.rank_components["ai"] <= 25);
        assert!(item.rank_components["social"] <= 20);
        assert!(item.rank_components["jitter"] <= JITTER_MAX);
    }

    #[test]
    fn same_seed_same_scores() {
        let a = HeuristicSelector::with_seed(42);
        let b = HeuristicSelector::with_seed(42);
        let c = cand("Nvidia gpu datacenter", "viral reddit debate", "https://x/2");
        assert_eq!(a.score(&c).score, b.score(&c).score);
    }

    #[tokio::test]
    async fn select_sorts_truncates_and_dedups() {
        let sel = HeuristicSelector::with_seed(1);
        let bucket = CategoryBucket::new(
            "finance",
            vec![
                cand("quiet day", "nothing notable", "https://x/a"),
                cand("Fed rate decision", "central bank rate cut", "https://x/b"),
                cand("Fed rate decision", "central bank rate cut", "https://x/b"),
                cand("bank run fears spark crisis", "liquidity crunch", "https://x/c"),
            ],
        );
        let out = sel.select(&bucket, 2).await;
        assert_eq!(out.len(), 2);
        assert!(out[0].score >= out[1].score);
        let urls: Vec<_> = out.iter().map(|i| i.candidate.url.as_str()).collect();
        assert!(!urls.contains(&"https://x/a"));
        assert_eq!(
            urls.iter().collect::<std::collections::HashSet<_>>().len(),
            2
        );
    }

    #[test]
    fn phrase_terms_match_as_substrings() {
        let sel = HeuristicSelector::with_seed(3);
        let item = sel.score(&cand(
            "Central bank surprises",
            "a central bank moved",
            "https://x/3",
        ));
        assert!(item.rank_components["policy"] >= 12);
    }
}
