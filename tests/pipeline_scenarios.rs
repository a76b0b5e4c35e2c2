// tests/pipeline_scenarios.rs
// End-to-end pipeline runs against in-process mock collaborators: no
// network, no real git. Covers the heuristic ranking scenario, the
// no-discussion enrichment path, and delivery degradation on a failed push.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use finance_ai_scout::assemble::ReportAssembler;
use finance_ai_scout::deliver::message::Messenger;
use finance_ai_scout::deliver::publish::{RemoteSync, SyncOutcome};
use finance_ai_scout::deliver::store::ReportStore;
use finance_ai_scout::deliver::Dispatcher;
use finance_ai_scout::enrich::{DiscussionSource, SentimentEnricher};
use finance_ai_scout::llm::{RankRequest, RankingBackend, SelectedItem};
use finance_ai_scout::pipeline::{Pipeline, RunOutcome};
use finance_ai_scout::select::heuristic::HeuristicSelector;
use finance_ai_scout::source::{CategoryProfile, FetchConstraints, SourceAdapter};
use finance_ai_scout::types::{
    ChannelKind, DeliveryStatus, RawCandidate, SENTIMENT_NO_DISCUSSION,
};

// --- mocks ---

struct FixedSource(Vec<RawCandidate>);

#[async_trait]
impl SourceAdapter for FixedSource {
    async fn fetch(
        &self,
        _category: &str,
        _query: &str,
        _constraints: &FetchConstraints,
    ) -> Result<Vec<RawCandidate>> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

struct NoDiscussions;

#[async_trait]
impl DiscussionSource for NoDiscussions {
    async fn discussions(
        &self,
        _title: &str,
        _domains: &[String],
        _max: usize,
    ) -> Result<Vec<String>> {
        Ok(vec![])
    }
}

/// Panics if condensation is attempted; scenario B requires the step to be
/// skipped entirely.
struct UnreachableCondenser;

#[async_trait]
impl RankingBackend for UnreachableCondenser {
    async fn rank(&self, _req: RankRequest<'_>) -> Result<Vec<SelectedItem>> {
        Err(anyhow!("not a ranker"))
    }
    async fn condense(&self, _subject: &str, _snippets: &[String]) -> Result<String> {
        panic!("condensation must be skipped when no discussion was found")
    }
    fn name(&self) -> &'static str {
        "unreachable"
    }
}

struct RecordingMessenger {
    sent: Arc<AtomicBool>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, _text: &str) -> Result<()> {
        self.sent.store(true, Ordering::SeqCst);
        Ok(())
    }
    fn target(&self) -> String {
        "test:recorder".to_string()
    }
}

/// Simulates a network error on push: the commit happened, the push did not.
struct PushFailsSync;

#[async_trait]
impl RemoteSync for PushFailsSync {
    async fn sync(&self, _date_key: &str) -> Result<SyncOutcome> {
        Ok(SyncOutcome::PushFailed)
    }
}

// --- helpers ---

fn cand(title: &str, snippet: &str, n: usize) -> RawCandidate {
    RawCandidate {
        title: title.to_string(),
        url: format!("https://news.example.com/{n}"),
        source: "news.example.com".to_string(),
        published_at: "2026-08-29".to_string(),
        body_snippet: snippet.to_string(),
    }
}

fn finance_profile() -> CategoryProfile {
    CategoryProfile {
        name: "finance".to_string(),
        query: String::new(),
        constraints: FetchConstraints {
            days: 1,
            include_domains: vec![],
            max_results: 50,
        },
    }
}

fn tmp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "scout_{tag}_{}",
        std::time::UNIX_EPOCH.elapsed().unwrap().as_nanos()
    ))
}

fn enricher_without_discussion() -> Arc<SentimentEnricher> {
    Arc::new(SentimentEnricher::new(
        Some(Arc::new(NoDiscussions)),
        Some(Arc::new(UnreachableCondenser)),
    ))
}

// --- scenario A: heuristic ranking of policy-heavy items ---

#[tokio::test]
async fn heuristic_ranks_fed_rate_items_on_top() {
    let mut bucket = Vec::new();
    for i in 0..17 {
        bucket.push(cand(
            &format!("Quarterly product notes {i}"),
            "a quiet day with routine updates",
            i,
        ));
    }
    for i in 17..20 {
        bucket.push(cand(
            "Fed weighs rate decision",
            "the fed discussed the rate path again: fed rate fed rate",
            i,
        ));
    }

    let dir = tmp_dir("scenario_a");
    let pipeline = Pipeline::new(
        vec![(finance_profile(), Arc::new(FixedSource(bucket)))],
        Arc::new(HeuristicSelector::with_seed(11)),
        enricher_without_discussion(),
        ReportAssembler::merged(),
        Dispatcher::new(ReportStore::new(&dir)),
        vec![ChannelKind::PersistFile],
    )
    .with_limit(10);

    let RunOutcome::Completed(summary) = pipeline.run().await.unwrap() else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.fetched, 20);
    assert_eq!(summary.selected, 10);

    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let md = fs::read_to_string(dir.join(format!("{date}.md"))).unwrap();
    // The three policy items outrank everything else; jitter tops out at 5,
    // far below the fed+rate policy score.
    let first_three: Vec<&str> = md
        .lines()
        .filter(|l| l.starts_with("## "))
        .take(3)
        .collect();
    assert!(first_three
        .iter()
        .all(|l| l.contains("Fed weighs rate decision")));
    let _ = fs::remove_dir_all(&dir);
}

// --- scenario B: zero discussion snippets → sentinel, condense skipped ---

#[tokio::test]
async fn empty_discussion_yields_sentinel_in_report() {
    let dir = tmp_dir("scenario_b");
    let pipeline = Pipeline::new(
        vec![(
            finance_profile(),
            Arc::new(FixedSource(vec![cand("Obscure filing", "fed rate", 1)])),
        )],
        Arc::new(HeuristicSelector::with_seed(2)),
        enricher_without_discussion(),
        ReportAssembler::merged(),
        Dispatcher::new(ReportStore::new(&dir)),
        vec![ChannelKind::PersistFile],
    );

    let RunOutcome::Completed(_) = pipeline.run().await.unwrap() else {
        panic!("expected a completed run");
    };
    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let md = fs::read_to_string(dir.join(format!("{date}.md"))).unwrap();
    assert!(md.contains(SENTIMENT_NO_DISCUSSION));
    let _ = fs::remove_dir_all(&dir);
}

// --- scenario C: push fails, run still completes, file persisted ---

#[tokio::test]
async fn failed_push_degrades_to_saved_but_not_published() {
    let dir = tmp_dir("scenario_c");
    let sent = Arc::new(AtomicBool::new(false));
    let dispatcher = Dispatcher::new(ReportStore::new(&dir))
        .with_messenger(Arc::new(RecordingMessenger { sent: sent.clone() }))
        .with_sync(Arc::new(PushFailsSync));

    let pipeline = Pipeline::new(
        vec![(
            finance_profile(),
            Arc::new(FixedSource(vec![cand("Fed rate shock", "fed rate crisis", 1)])),
        )],
        Arc::new(HeuristicSelector::with_seed(5)),
        enricher_without_discussion(),
        ReportAssembler::merged(),
        dispatcher,
        vec![ChannelKind::PushMessage, ChannelKind::PersistAndPublish],
    );

    let RunOutcome::Completed(summary) = pipeline.run().await.unwrap() else {
        panic!("run must complete despite the failed push");
    };

    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let path = dir.join(format!("{date}.md"));
    assert!(path.exists(), "local report is the source of truth");
    assert!(sent.load(Ordering::SeqCst), "other channels keep working");

    let publish = summary
        .receipts
        .iter()
        .find(|r| r.channel == ChannelKind::PersistAndPublish)
        .unwrap();
    assert_eq!(publish.status, DeliveryStatus::Failed);
    let push = summary
        .receipts
        .iter()
        .find(|r| r.channel == ChannelKind::PushMessage)
        .unwrap();
    assert_eq!(push.status, DeliveryStatus::Sent);
    let _ = fs::remove_dir_all(&dir);
}

// --- empty intake aborts before any later stage ---

#[tokio::test]
async fn all_empty_buckets_abort_the_run() {
    let pipeline = Pipeline::new(
        vec![(finance_profile(), Arc::new(FixedSource(vec![])))],
        Arc::new(HeuristicSelector::with_seed(1)),
        enricher_without_discussion(),
        ReportAssembler::merged(),
        Dispatcher::new(ReportStore::new(tmp_dir("empty"))),
        vec![ChannelKind::PersistFile],
    );
    assert!(matches!(
        pipeline.run().await.unwrap(),
        RunOutcome::NoCandidates
    ));
}

// --- abort flag stops the run between stages ---

#[tokio::test]
async fn raised_abort_flag_stops_after_fetch() {
    let pipeline = Pipeline::new(
        vec![(
            finance_profile(),
            Arc::new(FixedSource(vec![cand("t", "fed", 1)])),
        )],
        Arc::new(HeuristicSelector::with_seed(1)),
        enricher_without_discussion(),
        ReportAssembler::merged(),
        Dispatcher::new(ReportStore::new(tmp_dir("abort"))),
        vec![ChannelKind::PersistFile],
    );
    pipeline.abort_handle().store(true, Ordering::SeqCst);
    assert!(matches!(pipeline.run().await.unwrap(), RunOutcome::Aborted));
}

// --- sectioned flow keeps categories separate, dedups across them ---

#[tokio::test]
async fn sectioned_run_dedups_cross_category_urls() {
    let shared = cand("Shared story", "fed rate", 99);
    let dir = tmp_dir("sectioned");
    let ai_profile = CategoryProfile {
        name: "ai".to_string(),
        ..finance_profile()
    };
    let pipeline = Pipeline::new(
        vec![
            (
                finance_profile(),
                Arc::new(FixedSource(vec![shared.clone(), cand("Fin only", "fed", 1)])),
            ),
            (
                ai_profile,
                Arc::new(FixedSource(vec![shared, cand("AI only", "nvidia gpu", 2)])),
            ),
        ],
        Arc::new(HeuristicSelector::with_seed(3)),
        enricher_without_discussion(),
        ReportAssembler::sectioned(),
        Dispatcher::new(ReportStore::new(&dir)),
        vec![ChannelKind::PersistFile],
    );

    let RunOutcome::Completed(summary) = pipeline.run().await.unwrap() else {
        panic!("expected a completed run");
    };
    // 4 selected, 1 cross-category duplicate dropped at assembly.
    assert_eq!(summary.selected, 4);
    assert_eq!(summary.report_items, 3);
    let _ = fs::remove_dir_all(&dir);
}
