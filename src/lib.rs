// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod assemble;
pub mod config;
pub mod deliver;
pub mod enrich;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod retry;
pub mod select;
pub mod source;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::assemble::{AssemblyMode, ReportAssembler, DEFAULT_MAX_ITEMS};
pub use crate::config::{RemoteRepo, ScoutConfig};
pub use crate::deliver::Dispatcher;
pub use crate::enrich::SentimentEnricher;
pub use crate::pipeline::{Pipeline, RunOutcome, RunSummary};
pub use crate::types::{
    ChannelKind, DeliveryReceipt, DeliveryStatus, EnrichedItem, RankedItem, RawCandidate, Report,
    ReportBody,
};
