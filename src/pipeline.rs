// src/pipeline.rs
//! Pipeline orchestrator: fetch → select → enrich → assemble → deliver.
//! Every run starts cold; nothing is cached across runs. An external abort
//! flag is checked between stages (in-flight enrichment calls finish on
//! their own).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::assemble::ReportAssembler;
use crate::deliver::Dispatcher;
use crate::enrich::SentimentEnricher;
use crate::select::Selector;
use crate::source::{CategoryProfile, SourceAdapter};
use crate::types::{CategoryBucket, ChannelKind, DeliveryReceipt, EnrichedItem, RankedItem};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scout_candidates_total", "Raw candidates fetched.");
        describe_counter!("scout_selected_total", "Items surviving selection.");
        describe_counter!(
            "scout_selection_failures_total",
            "Categories degraded to empty by a failed delegated ranking."
        );
        describe_counter!(
            "scout_enrich_fallback_total",
            "Enrichments that fell back to a sentinel."
        );
        describe_counter!("scout_delivery_failures_total", "Failed delivery channels.");
        describe_gauge!("scout_run_last_ts", "Unix ts of the last completed run.");
    });
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub fetched: usize,
    pub selected: usize,
    pub report_items: usize,
    pub receipts: Vec<DeliveryReceipt>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Every category's raw bucket came back empty.
    NoCandidates,
    /// The abort flag was raised between stages.
    Aborted,
}

pub struct Pipeline {
    sources: Vec<(CategoryProfile, Arc<dyn SourceAdapter>)>,
    selector: Arc<dyn Selector>,
    enricher: Arc<SentimentEnricher>,
    assembler: ReportAssembler,
    dispatcher: Dispatcher,
    channels: Vec<ChannelKind>,
    per_category_limit: usize,
    enrich_workers: usize,
    abort: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        sources: Vec<(CategoryProfile, Arc<dyn SourceAdapter>)>,
        selector: Arc<dyn Selector>,
        enricher: Arc<SentimentEnricher>,
        assembler: ReportAssembler,
        dispatcher: Dispatcher,
        channels: Vec<ChannelKind>,
    ) -> Self {
        Self {
            sources,
            selector,
            enricher,
            assembler,
            dispatcher,
            channels,
            per_category_limit: 10,
            enrich_workers: 4,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.per_category_limit = limit;
        self
    }

    pub fn with_enrich_workers(mut self, workers: usize) -> Self {
        self.enrich_workers = workers.max(1);
        self
    }

    /// Flag checked between stages; raise it to cancel the run.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    fn aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        ensure_metrics_described();

        // --- fetch ---
        tracing::info!(stage = "fetch", "starting");
        let mut buckets: Vec<CategoryBucket> = Vec::with_capacity(self.sources.len());
        for (profile, adapter) in &self.sources {
            let items = match adapter
                .fetch(&profile.name, &profile.query, &profile.constraints)
                .await
            {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        category = %profile.name,
                        adapter = adapter.name(),
                        error = ?e,
                        "fetch failed; category starts empty"
                    );
                    Vec::new()
                }
            };
            counter!("scout_candidates_total").increment(items.len() as u64);
            tracing::info!(category = %profile.name, count = items.len(), "fetched");
            buckets.push(CategoryBucket::new(profile.name.clone(), items));
        }
        let fetched: usize = buckets.iter().map(|b| b.items.len()).sum();
        tracing::info!(stage = "fetch", fetched, "done");
        if fetched == 0 {
            tracing::warn!("no candidates in any category; aborting run");
            return Ok(RunOutcome::NoCandidates);
        }
        if self.aborted() {
            tracing::info!("abort requested after fetch");
            return Ok(RunOutcome::Aborted);
        }

        // --- select ---
        tracing::info!(stage = "select", "starting");
        let mut selected: Vec<(String, Vec<RankedItem>)> = Vec::with_capacity(buckets.len());
        for bucket in &buckets {
            if bucket.is_empty() {
                continue;
            }
            let items = self.selector.select(bucket, self.per_category_limit).await;
            counter!("scout_selected_total").increment(items.len() as u64);
            tracing::info!(category = %bucket.name, count = items.len(), "selected");
            selected.push((bucket.name.clone(), items));
        }
        let selected_count: usize = selected.iter().map(|(_, v)| v.len()).sum();
        tracing::info!(stage = "select", selected = selected_count, "done");
        if selected_count == 0 {
            tracing::warn!("selection left nothing to enrich; run ends without a report");
            return Ok(RunOutcome::Completed(RunSummary {
                fetched,
                selected: 0,
                report_items: 0,
                receipts: Vec::new(),
            }));
        }
        if self.aborted() {
            tracing::info!("abort requested after select");
            return Ok(RunOutcome::Aborted);
        }

        // --- enrich (bounded fan-out, no cross-item state) ---
        tracing::info!(stage = "enrich", workers = self.enrich_workers, "starting");
        let enriched = self.enrich_all(selected).await;
        tracing::info!(stage = "enrich", "done");
        if self.aborted() {
            tracing::info!("abort requested after enrich");
            return Ok(RunOutcome::Aborted);
        }

        // --- assemble ---
        tracing::info!(stage = "assemble", "starting");
        let report = self.assembler.assemble(enriched);
        tracing::info!(stage = "assemble", items = report.len(), "done");
        if report.is_empty() {
            tracing::warn!("assembled report is empty; skipping delivery");
            return Ok(RunOutcome::Completed(RunSummary {
                fetched,
                selected: selected_count,
                report_items: 0,
                receipts: Vec::new(),
            }));
        }
        if self.aborted() {
            tracing::info!("abort requested after assemble");
            return Ok(RunOutcome::Aborted);
        }

        // --- deliver ---
        tracing::info!(stage = "deliver", channels = self.channels.len(), "starting");
        let receipts = self.dispatcher.deliver(&report, &self.channels).await;
        tracing::info!(stage = "deliver", "done");

        gauge!("scout_run_last_ts").set(chrono::Utc::now().timestamp() as f64);
        Ok(RunOutcome::Completed(RunSummary {
            fetched,
            selected: selected_count,
            report_items: report.len(),
            receipts,
        }))
    }

    /// Fan enrichment out over a bounded worker pool. Output order inside
    /// each category is the selector's ranking, reassembled after everything
    /// finishes (never completion order).
    async fn enrich_all(
        &self,
        selected: Vec<(String, Vec<RankedItem>)>,
    ) -> Vec<(String, Vec<EnrichedItem>)> {
        let sem = Arc::new(Semaphore::new(self.enrich_workers));
        let mut slots: Vec<(String, Vec<Option<EnrichedItem>>)> = selected
            .iter()
            .map(|(name, items)| (name.clone(), (0..items.len()).map(|_| None).collect()))
            .collect();

        let mut set = JoinSet::new();
        for (ci, (_, items)) in selected.into_iter().enumerate() {
            for (ii, item) in items.into_iter().enumerate() {
                let sem = sem.clone();
                let enricher = self.enricher.clone();
                set.spawn(async move {
                    let _permit = sem.acquire_owned().await.expect("semaphore closed");
                    (ci, ii, enricher.enrich(item).await)
                });
            }
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((ci, ii, item)) => slots[ci].1[ii] = Some(item),
                Err(e) => tracing::warn!(error = ?e, "enrichment task failed; item dropped"),
            }
        }

        slots
            .into_iter()
            .map(|(name, items)| (name, items.into_iter().flatten().collect()))
            .collect()
    }
}
