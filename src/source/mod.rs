// src/source/mod.rs
//! Candidate intake: the `SourceAdapter` seam plus the concrete search and
//! RSS adapters, and the fixed category profiles the daily run uses.

pub mod rss;
pub mod tavily;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::RawCandidate;

/// Constraints passed with every fetch: recency window in days, domain
/// allow-list, and a result cap.
#[derive(Debug, Clone)]
pub struct FetchConstraints {
    pub days: u32,
    pub include_domains: Vec<String>,
    pub max_results: usize,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(
        &self,
        category: &str,
        query: &str,
        constraints: &FetchConstraints,
    ) -> Result<Vec<RawCandidate>>;

    fn name(&self) -> &'static str;
}

/// One category's fixed fetch parameters.
#[derive(Debug, Clone)]
pub struct CategoryProfile {
    pub name: String,
    pub query: String,
    pub constraints: FetchConstraints,
}

/// The two categories of the daily digest, with curated outlet allow-lists.
pub fn default_profiles() -> Vec<CategoryProfile> {
    let finance_domains = [
        "bloomberg.com",
        "reuters.com",
        "wsj.com",
        "ft.com",
        "cnbc.com",
        "barrons.com",
    ];
    let ai_domains = [
        "theverge.com",
        "techcrunch.com",
        "wired.com",
        "theinformation.com",
        "technologyreview.com",
        "openai.com",
        "blog.google",
        "anthropic.com",
    ];

    vec![
        CategoryProfile {
            name: "finance".to_string(),
            query: "latest major global macroeconomic news, central bank policies like fed rates, \
                    major stock market index movements S&P 500, geopolitical global impact, or \
                    top tier non-AI corporate earnings and shifts."
                .to_string(),
            constraints: FetchConstraints {
                days: 1,
                include_domains: finance_domains.iter().map(|s| s.to_string()).collect(),
                max_results: 15,
            },
        },
        CategoryProfile {
            name: "ai".to_string(),
            query: "latest breakthrough AI models releases, AI infrastructure NVIDIA AMD, major \
                    AI startup investments, tech giants AI mergers, high impact AI applications \
                    or major AI regulation news."
                .to_string(),
            constraints: FetchConstraints {
                days: 1,
                include_domains: ai_domains.iter().map(|s| s.to_string()).collect(),
                max_results: 15,
            },
        },
    ]
}

/// Normalize a snippet: decode HTML entities, strip tags, collapse
/// whitespace, cap length.
pub fn normalize_snippet(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    if out.chars().count() > 800 {
        out = out.chars().take(800).collect();
    }
    out
}

/// Best-effort host extraction for attributing an item to its outlet.
pub fn host_of(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
