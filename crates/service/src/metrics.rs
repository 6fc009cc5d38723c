use coerce::CoercionPass;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-lifetime counters for the core pipeline. All relaxed atomics;
/// these feed reporting, not control flow.
pub struct Metrics {
    extract_requests: AtomicUsize,
    model_replies: AtomicUsize,
    model_fallbacks: AtomicUsize,

    coercion_strict: AtomicUsize,
    coercion_relaxed: AtomicUsize,
    coercion_repaired: AtomicUsize,
    coercion_failed: AtomicUsize,

    documents_submitted: AtomicUsize,
    chunks_indexed: AtomicUsize,
    ingest_failures: AtomicUsize,
    searches: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            extract_requests: AtomicUsize::new(0),
            model_replies: AtomicUsize::new(0),
            model_fallbacks: AtomicUsize::new(0),
            coercion_strict: AtomicUsize::new(0),
            coercion_relaxed: AtomicUsize::new(0),
            coercion_repaired: AtomicUsize::new(0),
            coercion_failed: AtomicUsize::new(0),
            documents_submitted: AtomicUsize::new(0),
            chunks_indexed: AtomicUsize::new(0),
            ingest_failures: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
        })
    }

    pub fn record_extract_request(&self) {
        self.extract_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_call(&self, used: bool) {
        if used {
            self.model_replies.fetch_add(1, Ordering::Relaxed);
        } else {
            self.model_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_coercion(&self, pass: CoercionPass) {
        let counter = match pass {
            CoercionPass::Strict => &self.coercion_strict,
            CoercionPass::Relaxed => &self.coercion_relaxed,
            CoercionPass::Repaired => &self.coercion_repaired,
            CoercionPass::Failed => &self.coercion_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_document_submitted(&self) {
        self.documents_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_chunks_indexed(&self, chunks: usize) {
        self.chunks_indexed.fetch_add(chunks, Ordering::Relaxed);
    }

    pub fn record_ingest_failure(&self) {
        self.ingest_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            extract_requests: self.extract_requests.load(Ordering::Relaxed),
            model_replies: self.model_replies.load(Ordering::Relaxed),
            model_fallbacks: self.model_fallbacks.load(Ordering::Relaxed),
            coercion_strict: self.coercion_strict.load(Ordering::Relaxed),
            coercion_relaxed: self.coercion_relaxed.load(Ordering::Relaxed),
            coercion_repaired: self.coercion_repaired.load(Ordering::Relaxed),
            coercion_failed: self.coercion_failed.load(Ordering::Relaxed),
            documents_submitted: self.documents_submitted.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            ingest_failures: self.ingest_failures.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub extract_requests: usize,
    pub model_replies: usize,
    pub model_fallbacks: usize,
    pub coercion_strict: usize,
    pub coercion_relaxed: usize,
    pub coercion_repaired: usize,
    pub coercion_failed: usize,
    pub documents_submitted: usize,
    pub chunks_indexed: usize,
    pub ingest_failures: usize,
    pub searches: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_extract_request();
        metrics.record_model_call(true);
        metrics.record_model_call(false);
        metrics.record_coercion(CoercionPass::Relaxed);
        metrics.record_chunks_indexed(14);

        let snap = metrics.snapshot();
        assert_eq!(snap.extract_requests, 1);
        assert_eq!(snap.model_replies, 1);
        assert_eq!(snap.model_fallbacks, 1);
        assert_eq!(snap.coercion_relaxed, 1);
        assert_eq!(snap.chunks_indexed, 14);
    }
}
