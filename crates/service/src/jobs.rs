//! Observable job records for background document processing.
//!
//! Upload returns before indexing completes; the job record makes the
//! fire-and-forget contract inspectable instead of silently lossy.

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Done { chunks: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job_id: String,
    pub doc_id: String,
    pub state: JobState,
}

/// In-process registry of ingestion jobs.
#[derive(Default)]
pub struct JobTracker {
    jobs: DashMap<String, JobRecord>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, doc_id: &str) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.jobs.insert(
            job_id.clone(),
            JobRecord {
                job_id: job_id.clone(),
                doc_id: doc_id.to_string(),
                state: JobState::Queued,
            },
        );
        job_id
    }

    pub fn set_state(&self, job_id: &str, state: JobState) {
        if let Some(mut record) = self.jobs.get_mut(job_id) {
            record.state = state;
        }
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.get(job_id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
