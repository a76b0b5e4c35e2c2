// src/source/tavily.rs
//! Tavily search client. Used twice in the pipeline: as the candidate
//! source adapter (news topic, per-category domain allow-list) and as the
//! discussion source for sentiment enrichment (social domains only).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::enrich::DiscussionSource;
use crate::source::{host_of, normalize_snippet, FetchConstraints, SourceAdapter};
use crate::types::RawCandidate;

const SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
    include_domains: &'a [String],
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published_date: Option<String>,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("finance-ai-scout/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self { http, api_key }
    }

    pub async fn search(
        &self,
        query: &str,
        topic: Option<&str>,
        days: Option<u32>,
        include_domains: &[String],
        max_results: usize,
    ) -> Result<Vec<SearchHit>> {
        let req = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            topic,
            days,
            include_domains,
            max_results,
        };

        let resp = self
            .http
            .post(SEARCH_URL)
            .json(&req)
            .send()
            .await
            .context("tavily search request")?
            .error_for_status()
            .context("tavily search non-2xx")?;

        let body: SearchResponse = resp.json().await.context("tavily search body")?;
        Ok(body.results)
    }
}

/// Candidate intake over Tavily's news search.
pub struct TavilySourceAdapter {
    client: TavilyClient,
}

impl TavilySourceAdapter {
    pub fn new(client: TavilyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for TavilySourceAdapter {
    async fn fetch(
        &self,
        category: &str,
        query: &str,
        constraints: &FetchConstraints,
    ) -> Result<Vec<RawCandidate>> {
        let hits = self
            .client
            .search(
                query,
                Some("news"),
                Some(constraints.days),
                &constraints.include_domains,
                constraints.max_results,
            )
            .await
            .with_context(|| format!("fetching {category} candidates"))?;

        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            if hit.title.is_empty() || hit.url.is_empty() {
                continue;
            }
            out.push(RawCandidate {
                source: host_of(&hit.url),
                published_at: hit.published_date.unwrap_or_default(),
                body_snippet: normalize_snippet(&hit.content),
                title: normalize_snippet(&hit.title),
                url: hit.url,
            });
        }
        tracing::debug!(category, fetched = out.len(), "tavily fetch done");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "tavily"
    }
}

#[async_trait]
impl DiscussionSource for TavilyClient {
    async fn discussions(
        &self,
        title: &str,
        domains: &[String],
        max_results: usize,
    ) -> Result<Vec<String>> {
        let query =
            format!("Reddit AND Twitter (X) AND Hacker News reaction and comments to: {title}");
        let hits = self
            .search(&query, None, None, domains, max_results)
            .await
            .context("discussion lookup")?;
        Ok(hits
            .into_iter()
            .map(|h| normalize_snippet(&h.content))
            .filter(|s| !s.is_empty())
            .collect())
    }
}
