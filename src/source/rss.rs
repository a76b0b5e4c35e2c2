// src/source/rss.rs
//! RSS 2.0 candidate adapter for the heuristic flow: no search credential
//! required, candidates come straight from a curated feed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::source::{host_of, normalize_snippet, FetchConstraints, SourceAdapter};
use crate::types::RawCandidate;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

pub struct RssAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl RssAdapter {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn parse_items(xml: &str, constraints: &FetchConstraints) -> Result<Vec<RawCandidate>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let window = u64::from(constraints.days) * 86_400;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_snippet(it.title.as_deref().unwrap_or_default());
            let url = it.link.unwrap_or_default();
            if title.is_empty() || url.is_empty() {
                continue;
            }
            // Drop items older than the recency window when the pubDate parses.
            let published = it.pub_date.as_deref().unwrap_or_default();
            let ts = parse_rfc2822_to_unix(published);
            if ts > 0 && now.saturating_sub(ts) > window {
                continue;
            }
            out.push(RawCandidate {
                source: host_of(&url),
                published_at: published.to_string(),
                body_snippet: normalize_snippet(it.description.as_deref().unwrap_or_default()),
                title,
                url,
            });
            if out.len() >= constraints.max_results {
                break;
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch(
        &self,
        category: &str,
        _query: &str,
        constraints: &FetchConstraints,
    ) -> Result<Vec<RawCandidate>> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { url, client } => client
                .get(url)
                .send()
                .await
                .with_context(|| format!("rss get for {category}"))?
                .text()
                .await
                .context("rss body")?,
        };
        Self::parse_items(&body, constraints)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Wire</title>
  <item>
    <title>Fed signals rate path</title>
    <link>https://www.reuters.com/markets/fed-signals</link>
    <pubDate>Thu, 01 Jan 2099 09:00:00 +0000</pubDate>
    <description>&lt;p&gt;The Fed&amp;nbsp;signaled a slower path.&lt;/p&gt;</description>
  </item>
  <item>
    <title>Old story</title>
    <link>https://example.com/old</link>
    <pubDate>Mon, 01 Jan 2001 09:00:00 +0000</pubDate>
    <description>stale</description>
  </item>
  <item>
    <title></title>
    <link>https://example.com/untitled</link>
  </item>
</channel></rss>"#;

    fn constraints() -> FetchConstraints {
        FetchConstraints {
            days: 1,
            include_domains: vec![],
            max_results: 10,
        }
    }

    #[tokio::test]
    async fn parses_and_filters_by_recency() {
        let adapter = RssAdapter::from_fixture_str(FEED);
        let items = adapter.fetch("finance", "", &constraints()).await.unwrap();
        // Future-dated item kept, stale and untitled ones dropped.
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Fed signals rate path");
        assert_eq!(items[0].source, "reuters.com");
        assert_eq!(items[0].body_snippet, "The Fed signaled a slower path.");
    }

    #[test]
    fn rfc2822_parse_is_lenient_on_garbage() {
        assert_eq!(parse_rfc2822_to_unix("not a date"), 0);
    }
}
