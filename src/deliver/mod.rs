// src/deliver/mod.rs
//! Delivery dispatch: render the assembled report into the requested
//! channels and return one receipt per attempted channel. Channel failures
//! are isolated; a dead messenger never blocks persistence and vice versa.

pub mod message;
pub mod publish;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use crate::render::{render_markdown, render_message};
use crate::retry::{retry_until, RetryPolicy};
use crate::types::{ChannelKind, DeliveryReceipt, DeliveryStatus, Report};

use message::Messenger;
use publish::{RemoteSync, SyncOutcome};
use store::ReportStore;

pub struct Dispatcher {
    store: ReportStore,
    messenger: Option<Arc<dyn Messenger>>,
    sync: Option<Arc<dyn RemoteSync>>,
    /// When set, push messages reference the published artifact at
    /// `{base}/{date}.md` instead of carrying the inline text.
    public_base_url: Option<String>,
    poll: RetryPolicy,
    http: reqwest::Client,
}

impl Dispatcher {
    pub fn new(store: ReportStore) -> Self {
        Self {
            store,
            messenger: None,
            sync: None,
            public_base_url: None,
            poll: RetryPolicy::fixed(5, Duration::from_secs(2)),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    pub fn with_sync(mut self, sync: Arc<dyn RemoteSync>) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into());
        self
    }

    pub fn with_poll_policy(mut self, poll: RetryPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Deliver to each requested channel in order. Never fails the run: each
    /// channel's outcome lands in its receipt.
    ///
    /// With a public base URL configured the push message links to the
    /// published artifact, so persistence channels are dispatched first
    /// regardless of the caller's ordering; otherwise the artifact poll
    /// would HEAD a file that does not exist yet.
    pub async fn deliver(&self, report: &Report, channels: &[ChannelKind]) -> Vec<DeliveryReceipt> {
        let date_key = report.date_key();
        let mut ordered: Vec<ChannelKind> = channels.to_vec();
        if self.public_base_url.is_some() {
            ordered.sort_by_key(|c| matches!(c, ChannelKind::PushMessage));
        }
        let mut receipts = Vec::with_capacity(ordered.len());
        for channel in &ordered {
            let receipt = match channel {
                ChannelKind::PushMessage => self.push_message(report, &date_key).await,
                ChannelKind::PersistFile => self.persist_file(report, &date_key),
                ChannelKind::PersistAndPublish => self.persist_and_publish(report, &date_key).await,
            };
            if receipt.status == DeliveryStatus::Failed {
                counter!("scout_delivery_failures_total").increment(1);
            }
            tracing::info!(
                channel = %receipt.channel,
                status = ?receipt.status,
                target = receipt.target_reference.as_deref().unwrap_or("-"),
                "channel done"
            );
            receipts.push(receipt);
        }
        receipts
    }

    async fn push_message(&self, report: &Report, date_key: &str) -> DeliveryReceipt {
        let Some(messenger) = &self.messenger else {
            tracing::info!("push-message skipped (no messaging credential)");
            return DeliveryReceipt::new(ChannelKind::PushMessage, DeliveryStatus::Skipped);
        };

        let (text, target) = match &self.public_base_url {
            Some(base) => {
                let url = format!("{base}/{date_key}.md");
                // The publishing backend is eventually consistent; poll the
                // artifact before pointing subscribers at it.
                let outcome = retry_until(&self.poll, || self.artifact_reachable(&url)).await;
                if !outcome.succeeded() {
                    tracing::warn!(url, "published artifact not yet reachable; sending link anyway");
                }
                (
                    format!("\u{1F4CA} {}\nFull report: {url}", report.title),
                    url,
                )
            }
            None => (render_message(report), messenger.target()),
        };

        match messenger.send_text(&text).await {
            Ok(()) => DeliveryReceipt::new(ChannelKind::PushMessage, DeliveryStatus::Sent)
                .with_target(target),
            Err(e) => {
                tracing::warn!(error = ?e, "push-message failed");
                DeliveryReceipt::new(ChannelKind::PushMessage, DeliveryStatus::Failed)
                    .with_target(target)
            }
        }
    }

    async fn artifact_reachable(&self, url: &str) -> bool {
        match self.http.head(url).send().await {
            Ok(rsp) => rsp.status().is_success(),
            Err(_) => false,
        }
    }

    fn persist_file(&self, report: &Report, date_key: &str) -> DeliveryReceipt {
        match self.store.persist(date_key, &render_markdown(report)) {
            Ok(path) => DeliveryReceipt::new(ChannelKind::PersistFile, DeliveryStatus::Sent)
                .with_target(path.display().to_string()),
            Err(e) => {
                tracing::warn!(error = ?e, "persist-file failed");
                DeliveryReceipt::new(ChannelKind::PersistFile, DeliveryStatus::Failed)
            }
        }
    }

    async fn persist_and_publish(&self, report: &Report, date_key: &str) -> DeliveryReceipt {
        let path = match self.store.persist(date_key, &render_markdown(report)) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = ?e, "persist step of publish failed");
                return DeliveryReceipt::new(
                    ChannelKind::PersistAndPublish,
                    DeliveryStatus::Failed,
                );
            }
        };

        let Some(sync) = &self.sync else {
            tracing::warn!("publish requested without a sync backend; file persisted only");
            return DeliveryReceipt::new(ChannelKind::PersistAndPublish, DeliveryStatus::Skipped)
                .with_target(path.display().to_string());
        };

        match sync.sync(date_key).await {
            Ok(SyncOutcome::PushFailed) => {
                DeliveryReceipt::new(ChannelKind::PersistAndPublish, DeliveryStatus::Failed)
                    .with_target(path.display().to_string())
            }
            Ok(outcome) => {
                tracing::info!(?outcome, "publish sync done");
                DeliveryReceipt::new(ChannelKind::PersistAndPublish, DeliveryStatus::Sent)
                    .with_target(path.display().to_string())
            }
            Err(e) => {
                tracing::warn!(error = ?e, "publish sync errored");
                DeliveryReceipt::new(ChannelKind::PersistAndPublish, DeliveryStatus::Failed)
                    .with_target(path.display().to_string())
            }
        }
    }
}
