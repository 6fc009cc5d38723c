//! Cache-checked evidence retrieval over the vector store.

use crate::metrics::Metrics;
use anyhow::Result;
use cache::ResponseCache;
use retrieval::{SearchHit, VectorStore};
use std::sync::Arc;

const OP: &str = "evidence";
const VERSION: &str = "1.0.0";

pub struct EvidenceService {
    store: Arc<VectorStore>,
    cache: Arc<ResponseCache>,
    metrics: Arc<Metrics>,
    cache_enabled: bool,
}

impl EvidenceService {
    pub fn new(
        store: Arc<VectorStore>,
        cache: Arc<ResponseCache>,
        metrics: Arc<Metrics>,
        cache_enabled: bool,
    ) -> Self {
        Self {
            store,
            cache,
            metrics,
            cache_enabled,
        }
    }

    /// Ranked evidence snippets for a query. Embedding/disk failures are
    /// surfaced; an empty corpus is an empty result.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.metrics.record_search();
        let k_str = k.to_string();
        let args = [query, k_str.as_str()];

        if self.cache_enabled {
            if let Some(value) = self.cache.get(OP, VERSION, &args) {
                if let Ok(hits) = serde_json::from_value::<Vec<SearchHit>>(value) {
                    return Ok(hits);
                }
            }
        }

        let hits = self.store.search(query, k).await?;
        if self.cache_enabled {
            if let Ok(value) = serde_json::to_value(&hits) {
                self.cache.set(OP, VERSION, &args, value);
            }
        }
        Ok(hits)
    }
}
