//! Background document ingestion.
//!
//! `submit` returns the document id immediately; chunking, embedding and
//! indexing happen in a spawned task whose progress is visible through the
//! job tracker. Errors are captured into the job record and logged, never
//! propagated to the submitter.

use crate::jobs::{JobState, JobTracker};
use crate::metrics::Metrics;
use retrieval::{doc_id_for, VectorStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub doc_id: String,
    pub job_id: String,
}

pub struct IngestService {
    store: Arc<VectorStore>,
    jobs: Arc<JobTracker>,
    metrics: Arc<Metrics>,
}

impl IngestService {
    pub fn new(store: Arc<VectorStore>, jobs: Arc<JobTracker>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            jobs,
            metrics,
        }
    }

    /// Queue a document for indexing and return at once. The returned
    /// `doc_id` is deterministic, so callers can reference the document
    /// before processing completes; `job_id` exposes the outcome.
    pub fn submit(&self, title: String, source: String, text: String) -> SubmitOutcome {
        let doc_id = doc_id_for(&title, &source);
        let job_id = self.jobs.create(&doc_id);
        self.metrics.record_document_submitted();

        let store = self.store.clone();
        let jobs = self.jobs.clone();
        let metrics = self.metrics.clone();
        let job = job_id.clone();

        tokio::spawn(async move {
            jobs.set_state(&job, JobState::Processing);
            match store.add_document(&title, &source, &text).await {
                Ok(outcome) => {
                    metrics.record_chunks_indexed(outcome.chunk_count);
                    info!(
                        doc_id = outcome.doc_id,
                        chunks = outcome.chunk_count,
                        "document indexed"
                    );
                    jobs.set_state(
                        &job,
                        JobState::Done {
                            chunks: outcome.chunk_count,
                        },
                    );
                }
                Err(e) => {
                    metrics.record_ingest_failure();
                    error!(error = %e, "document ingestion failed");
                    jobs.set_state(
                        &job,
                        JobState::Failed {
                            error: e.to_string(),
                        },
                    );
                }
            }
        });

        SubmitOutcome { doc_id, job_id }
    }
}
