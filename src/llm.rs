// src/llm.rs
//! Ranking/condensation backend. One trait, two operations: `rank` asks the
//! service to filter a raw bucket down to a fixed-schema top list, `condense`
//! turns raw discussion snippets into one short commentary line.
//!
//! Responses are validated against the schema at this boundary; anything
//! malformed surfaces as an `Err` and is degraded by the caller, never
//! passed inward partially shaped.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RawCandidate;

/// Item shape the ranking service must return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedItem {
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
    pub url: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct RankRequest<'a> {
    pub category: &'a str,
    /// Textual selection criteria (what counts as high-impact vs noise).
    pub policy: &'a str,
    pub candidates: &'a [RawCandidate],
    pub target: usize,
}

#[async_trait]
pub trait RankingBackend: Send + Sync {
    async fn rank(&self, req: RankRequest<'_>) -> Result<Vec<SelectedItem>>;
    async fn condense(&self, subject: &str, snippets: &[String]) -> Result<String>;
    fn name(&self) -> &'static str;
}

// ------------------------------------------------------------
// Gemini implementation
// ------------------------------------------------------------

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Commentary length cap, roughly one short sentence.
pub const CONDENSE_MAX_CHARS: usize = 120;

pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    rank_model: String,
    condense_model: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("finance-ai-scout/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            rank_model: "gemini-pro-latest".to_string(),
            condense_model: "gemini-flash-latest".to_string(),
        }
    }

    async fn generate(&self, model: &str, prompt: &str, json_output: bool) -> Result<String> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig<'a> {
            temperature: f32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_mime_type: Option<&'a str>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            generation_config: GenerationConfig<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                // Low temperature for factual picking.
                temperature: if json_output { 0.2 } else { 0.3 },
                response_mime_type: json_output.then_some("application/json"),
            },
        };

        let url = format!("{GEMINI_BASE}/{model}:generateContent?key={}", self.api_key);
        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("gemini request")?
            .error_for_status()
            .context("gemini non-2xx")?;

        let body: Resp = resp.json().await.context("gemini body")?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| anyhow!("gemini response has no text part"))?;
        Ok(text)
    }
}

#[async_trait]
impl RankingBackend for GeminiBackend {
    async fn rank(&self, req: RankRequest<'_>) -> Result<Vec<SelectedItem>> {
        let context_str =
            serde_json::to_string_pretty(req.candidates).context("serialize candidates")?;
        let prompt = format!(
            "You are a top-tier market analyst. From the raw search results below, pick the {target} \
             most important {category} items by global market/industry impact.\n\n\
             Selection criteria:\n{policy}\n\
             - Only events from the last 24 hours qualify.\n\
             - Respond with JSON only, exactly this shape:\n\
             {{\"items\": [{{\"title\": \"...\", \"source\": \"...\", \"published_at\": \"...\", \
             \"url\": \"...\", \"summary\": \"...\"}}]}}\n\
             - Return at most {target} items. Keep each summary to two factual sentences.\n\n\
             Raw results:\n{context_str}",
            target = req.target,
            category = req.category,
            policy = req.policy,
        );

        let text = self.generate(&self.rank_model, &prompt, true).await?;
        parse_rank_payload(&text, req.target)
    }

    async fn condense(&self, subject: &str, snippets: &[String]) -> Result<String> {
        let bullets: String = snippets.iter().map(|s| format!("- {s}\n")).collect();
        let prompt = format!(
            "News event: \"{subject}\"\n\
             Raw community discussion snippets scraped from X (Twitter), Reddit and Hacker News:\n\
             {bullets}\n\
             In one sentence (under {CONDENSE_MAX_CHARS} characters), summarize the overall \
             community mood and the main point of contention (e.g. bullish, bearish, or a \
             specific worry). Output only the sentence."
        );
        let text = self.generate(&self.condense_model, &prompt, false).await?;
        let line = sanitize_line(&text, CONDENSE_MAX_CHARS);
        if line.is_empty() {
            return Err(anyhow!("gemini condensation returned empty text"));
        }
        Ok(line)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Parse and validate the ranking payload. Items missing a title or URL are
/// dropped; more than `target` items are truncated.
pub fn parse_rank_payload(text: &str, target: usize) -> Result<Vec<SelectedItem>> {
    #[derive(Deserialize)]
    struct Envelope {
        items: Vec<SelectedItem>,
    }
    let env: Envelope = serde_json::from_str(text).context("rank payload schema")?;
    let mut items: Vec<SelectedItem> = env
        .items
        .into_iter()
        .filter(|it| !it.title.trim().is_empty() && !it.url.trim().is_empty())
        .collect();
    items.truncate(target);
    Ok(items)
}

/// Collapse to a single trimmed line capped at `max` chars.
pub fn sanitize_line(input: &str, max: usize) -> String {
    let mut out = String::with_capacity(max);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c => c,
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.chars().count() >= max {
            break;
        }
    }
    out.trim().to_string()
}
