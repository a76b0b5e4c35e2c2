// tests/delivery.rs
// Dispatcher behavior in isolation: channel independence, skipped channels,
// and receipt targets.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use finance_ai_scout::deliver::message::Messenger;
use finance_ai_scout::deliver::publish::{RemoteSync, SyncOutcome};
use finance_ai_scout::deliver::store::ReportStore;
use finance_ai_scout::deliver::Dispatcher;
use finance_ai_scout::retry::RetryPolicy;
use finance_ai_scout::types::{
    ChannelKind, DeliveryStatus, RankedItem, RawCandidate, Report, ReportBody,
};

struct DeadMessenger;

#[async_trait]
impl Messenger for DeadMessenger {
    async fn send_text(&self, _text: &str) -> Result<()> {
        Err(anyhow!("messaging transport down"))
    }
    fn target(&self) -> String {
        "test:dead".to_string()
    }
}

struct OkSync;

#[async_trait]
impl RemoteSync for OkSync {
    async fn sync(&self, _date_key: &str) -> Result<SyncOutcome> {
        Ok(SyncOutcome::Pushed)
    }
}

/// Records whether the persisted report file already existed when the push
/// message went out.
struct FileCheckingMessenger {
    expected: PathBuf,
    existed_at_send: Mutex<Option<bool>>,
}

#[async_trait]
impl Messenger for FileCheckingMessenger {
    async fn send_text(&self, _text: &str) -> Result<()> {
        *self.existed_at_send.lock().unwrap() = Some(self.expected.exists());
        Ok(())
    }
    fn target(&self) -> String {
        "test:recording".to_string()
    }
}

fn tmp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "scout_deliver_{tag}_{}",
        std::time::UNIX_EPOCH.elapsed().unwrap().as_nanos()
    ))
}

fn small_report() -> Report {
    let item = RankedItem::from_candidate(
        RawCandidate {
            title: "Fed rate decision".into(),
            url: "https://news.example.com/1".into(),
            source: "news.example.com".into(),
            published_at: "2026-08-29".into(),
            body_snippet: "snippet".into(),
        },
        42,
    )
    .into_enriched("community shrugged".into());
    Report {
        title: "Finance & AI Scout Daily Report".into(),
        generated_at: Utc::now(),
        body: ReportBody::Merged(vec![item]),
    }
}

#[tokio::test]
async fn dead_messenger_does_not_block_persistence() {
    let dir = tmp_dir("isolation");
    let dispatcher = Dispatcher::new(ReportStore::new(&dir))
        .with_messenger(Arc::new(DeadMessenger))
        .with_sync(Arc::new(OkSync));

    let report = small_report();
    let receipts = dispatcher
        .deliver(
            &report,
            &[ChannelKind::PushMessage, ChannelKind::PersistAndPublish],
        )
        .await;

    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].channel, ChannelKind::PushMessage);
    assert_eq!(receipts[0].status, DeliveryStatus::Failed);
    assert_eq!(receipts[1].status, DeliveryStatus::Sent);
    assert!(dir.join(format!("{}.md", report.date_key())).exists());
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn link_flow_publishes_before_pushing() {
    let dir = tmp_dir("linkorder");
    let report = small_report();
    let messenger = Arc::new(FileCheckingMessenger {
        expected: dir.join(format!("{}.md", report.date_key())),
        existed_at_send: Mutex::new(None),
    });
    // Base URL is never reachable; a short poll keeps the test fast.
    let dispatcher = Dispatcher::new(ReportStore::new(&dir))
        .with_messenger(messenger.clone())
        .with_sync(Arc::new(OkSync))
        .with_public_base_url("http://127.0.0.1:9/reports")
        .with_poll_policy(RetryPolicy::fixed(1, Duration::from_millis(1)));

    let receipts = dispatcher
        .deliver(
            &report,
            &[ChannelKind::PushMessage, ChannelKind::PersistAndPublish],
        )
        .await;

    // The publish receipt comes first even though the caller asked for the
    // push first: the linked artifact has to exist before it is polled.
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].channel, ChannelKind::PersistAndPublish);
    assert_eq!(receipts[0].status, DeliveryStatus::Sent);
    assert_eq!(receipts[1].channel, ChannelKind::PushMessage);
    assert_eq!(receipts[1].status, DeliveryStatus::Sent);
    assert_eq!(*messenger.existed_at_send.lock().unwrap(), Some(true));
    let target = receipts[1].target_reference.as_deref().unwrap();
    assert_eq!(
        target,
        format!("http://127.0.0.1:9/reports/{}.md", report.date_key())
    );
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_messenger_yields_skipped_receipt() {
    let dir = tmp_dir("skipped");
    let dispatcher = Dispatcher::new(ReportStore::new(&dir));
    let receipts = dispatcher
        .deliver(&small_report(), &[ChannelKind::PushMessage])
        .await;
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].status, DeliveryStatus::Skipped);
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn publish_without_sync_backend_is_skipped_but_persists() {
    let dir = tmp_dir("nosync");
    let dispatcher = Dispatcher::new(ReportStore::new(&dir));
    let report = small_report();
    let receipts = dispatcher
        .deliver(&report, &[ChannelKind::PersistAndPublish])
        .await;
    assert_eq!(receipts[0].status, DeliveryStatus::Skipped);
    assert!(dir.join(format!("{}.md", report.date_key())).exists());
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn persist_file_receipt_carries_the_path() {
    let dir = tmp_dir("receipt");
    let dispatcher = Dispatcher::new(ReportStore::new(&dir));
    let report = small_report();
    let receipts = dispatcher.deliver(&report, &[ChannelKind::PersistFile]).await;
    assert_eq!(receipts[0].status, DeliveryStatus::Sent);
    let target = receipts[0].target_reference.as_deref().unwrap();
    assert!(target.ends_with(&format!("{}.md", report.date_key())));
    let _ = fs::remove_dir_all(&dir);
}
