// src/render.rs
//! Rendering: markdown for the persisted report, a capped text block for the
//! push message.

use crate::types::{EnrichedItem, Report, ReportBody};

/// Hard cap for the push-message body, in characters.
pub const MESSAGE_CHAR_CAP: usize = 5000;
const ELLIPSIS: &str = "...";

pub fn render_markdown(report: &Report) -> String {
    let mut out = format!("# {}\n\n", report.title);
    match &report.body {
        ReportBody::Merged(items) => {
            for (i, item) in items.iter().enumerate() {
                push_markdown_item(&mut out, i + 1, item, "##");
            }
        }
        ReportBody::Sectioned(sections) => {
            for (name, items) in sections {
                out.push_str(&format!("## {}\n\n", section_heading(name)));
                for (i, item) in items.iter().enumerate() {
                    push_markdown_item(&mut out, i + 1, item, "###");
                }
            }
        }
    }
    out
}

fn push_markdown_item(out: &mut String, n: usize, item: &EnrichedItem, heading: &str) {
    out.push_str(&format!(
        "{heading} {n}. {} (score: {})\n\n",
        item.localized_title, item.score
    ));
    out.push_str(&format!("- **Source**: {}\n", item.source));
    if !item.published_at.is_empty() {
        out.push_str(&format!("- **Published**: {}\n", item.published_at));
    }
    out.push_str(&format!("- **Summary**: {}\n", item.localized_summary));
    out.push_str(&format!("- **Community pulse**: {}\n", item.sentiment_summary));
    out.push_str(&format!("- **Link**: [{}]({})\n\n---\n\n", item.url, item.url));
}

fn section_heading(name: &str) -> String {
    match name {
        "finance" => "Global Finance".to_string(),
        "ai" => "Global AI".to_string(),
        other => other.to_string(),
    }
}

/// Render the full report as a push-message text block, truncated to
/// `MESSAGE_CHAR_CAP` characters.
pub fn render_message(report: &Report) -> String {
    let mut body = format!("\u{1F4CA} {}\n\n", report.title);
    let mut n = 0usize;
    let mut push_item = |body: &mut String, item: &EnrichedItem| {
        n += 1;
        let marker = score_marker(item.score);
        body.push_str(&format!("{n}. {marker} [{}] {}\n", item.score, item.localized_title));
        body.push_str(&format!("   \u{1F4F0} {}", item.source));
        if !item.published_at.is_empty() {
            body.push_str(&format!(" | {}", item.published_at));
        }
        body.push('\n');
        let summary: String = item.localized_summary.chars().take(100).collect();
        if !summary.is_empty() {
            body.push_str(&format!("   \u{1F4DD} {summary}\n"));
        }
        body.push_str(&format!("   \u{1F4AC} {}\n", item.sentiment_summary));
        body.push_str(&format!("   \u{1F517} {}\n\n", item.url));
    };

    match &report.body {
        ReportBody::Merged(items) => {
            for item in items {
                push_item(&mut body, item);
            }
        }
        ReportBody::Sectioned(sections) => {
            for (name, items) in sections {
                body.push_str(&format!("\u{2014} {} \u{2014}\n", section_heading(name)));
                for item in items {
                    push_item(&mut body, item);
                }
            }
        }
    }

    truncate_with_ellipsis(&body, MESSAGE_CHAR_CAP)
}

fn score_marker(score: i32) -> &'static str {
    if score > 80 {
        "\u{1F534}"
    } else if score > 50 {
        "\u{1F7E1}"
    } else {
        "\u{1F7E2}"
    }
}

/// On overflow, keep exactly `cap - 10` characters and append a 3-char
/// ellipsis marker.
pub fn truncate_with_ellipsis(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }
    let mut out: String = text.chars().take(cap.saturating_sub(10)).collect();
    out.push_str(ELLIPSIS);
    out
}
