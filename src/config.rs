// src/config.rs
//! Explicit run configuration, read once from the environment and passed
//! into components at construction. No component reads env vars on its own.

use std::path::PathBuf;

/// Identity and credentials of the remote report repository.
#[derive(Debug, Clone)]
pub struct RemoteRepo {
    pub username: String,
    pub token: String,
    pub repo_name: String,
}

impl RemoteRepo {
    /// Token-authenticated push URL.
    pub fn push_url(&self) -> String {
        format!(
            "https://x-access-token:{}@github.com/{}/{}.git",
            self.token, self.username, self.repo_name
        )
    }
}

/// All recognized options. Effect of each being absent:
///
/// - `tavily_api_key`: candidate search yields empty buckets and the
///   discussion lookup short-circuits to the `no-API-key` sentinel.
/// - `gemini_api_key`: delegated selection is unavailable (the run falls
///   back to the heuristic strategy) and condensation is skipped.
/// - `line_access_token`: the push-message channel is skipped.
/// - `line_recipient`: messages are broadcast instead of addressed.
/// - `remote`: reports are committed locally only, never pushed.
/// - `public_base_url`: push messages carry the inline report text instead
///   of a link to the published artifact.
/// - `jitter_seed`: heuristic jitter is seeded from OS entropy.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub tavily_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub line_access_token: Option<String>,
    pub line_recipient: Option<String>,
    pub remote: Option<RemoteRepo>,
    pub report_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub jitter_seed: Option<u64>,
}

impl ScoutConfig {
    pub fn from_env() -> Self {
        let remote = match (non_empty("GITHUB_USERNAME"), non_empty("GITHUB_TOKEN")) {
            (Some(username), Some(token)) => Some(RemoteRepo {
                username,
                token,
                repo_name: non_empty("GITHUB_REPO_NAME")
                    .unwrap_or_else(|| "Finance-AI-Scout".to_string()),
            }),
            _ => None,
        };

        Self {
            tavily_api_key: non_empty("TAVILY_API_KEY"),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            // Older deployments used LINE_CHANNEL_ID for the same value.
            line_access_token: non_empty("LINE_CHANNEL_ACCESS_TOKEN")
                .or_else(|| non_empty("LINE_CHANNEL_ID")),
            line_recipient: non_empty("LINE_USER_ID"),
            remote,
            report_dir: non_empty("REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("reports")),
            public_base_url: non_empty("REPORT_PUBLIC_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string()),
            jitter_seed: non_empty("SCOUT_JITTER_SEED").and_then(|s| s.parse().ok()),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
