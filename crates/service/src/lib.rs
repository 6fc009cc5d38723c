//! Orchestration layer over the core crates: cache-checked LLM calls,
//! coercion, normalization, composition, evidence retrieval and background
//! document ingestion. Plain structured values at every boundary; no
//! framework types, so any routing layer can sit on top.

pub mod app;
pub mod compose;
pub mod config;
pub mod evidence;
pub mod extract;
pub mod ingest;
pub mod jobs;
pub mod llm;
pub mod metrics;
pub mod prompts;
pub mod rationale;

pub use app::Services;
pub use compose::{ComposeRequest, ComposeService, Composition, OutlineSection};
pub use config::Config;
pub use evidence::EvidenceService;
pub use extract::{ExtractOutcome, ExtractService};
pub use ingest::{IngestService, SubmitOutcome};
pub use jobs::{JobRecord, JobState, JobTracker};
pub use llm::{ChatModel, OpenAiCompatClient};
pub use metrics::{Metrics, MetricsSnapshot};
pub use rationale::{RationaleCard, RationaleService};

/// Install the global log subscriber. Call once from the embedding binary.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
