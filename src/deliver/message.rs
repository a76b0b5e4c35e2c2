// src/deliver/message.rs
//! Push messaging over the LINE bot API: addressed push when a recipient id
//! is configured, broadcast otherwise. Transient failures are retried with
//! exponential backoff.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";
const BROADCAST_URL: &str = "https://api.line.me/v2/bot/message/broadcast";

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;
    /// Human-readable target for receipts/logs, e.g. "line:broadcast".
    fn target(&self) -> String;
}

#[derive(Clone)]
pub struct LineMessenger {
    token: String,
    recipient: Option<String>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl LineMessenger {
    pub fn new(token: String, recipient: Option<String>) -> Self {
        Self {
            token,
            recipient,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }
}

#[async_trait]
impl Messenger for LineMessenger {
    async fn send_text(&self, text: &str) -> Result<()> {
        let (url, body) = match &self.recipient {
            Some(to) => (
                PUSH_URL,
                json!({ "to": to, "messages": [{ "type": "text", "text": text }] }),
            ),
            None => (
                BROADCAST_URL,
                json!({ "messages": [{ "type": "text", "text": text }] }),
            ),
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(url)
                .bearer_auth(&self.token)
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("LINE push HTTP error: {e}"));
                    }
                    tracing::info!(target_ref = %self.target(), "LINE message sent");
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("LINE push request failed: {e}"));
                }
            }
        }
    }

    fn target(&self) -> String {
        match &self.recipient {
            Some(to) => format!("line:{to}"),
            None => "line:broadcast".to_string(),
        }
    }
}
