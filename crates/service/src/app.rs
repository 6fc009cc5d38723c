//! Wiring: build every service from a single config. The embedding
//! routing layer holds one of these and calls plain methods on it.

use crate::compose::ComposeService;
use crate::config::Config;
use crate::evidence::EvidenceService;
use crate::extract::ExtractService;
use crate::ingest::IngestService;
use crate::jobs::JobTracker;
use crate::llm::{ChatModel, OpenAiCompatClient};
use crate::metrics::Metrics;
use anyhow::Result;
use cache::ResponseCache;
use retrieval::{Embedder, HttpEmbedder, VectorStore};
use std::sync::Arc;

pub struct Services {
    pub cache: Arc<ResponseCache>,
    pub metrics: Arc<Metrics>,
    pub jobs: Arc<JobTracker>,
    pub store: Arc<VectorStore>,
    pub extract: ExtractService,
    pub rationale: crate::rationale::RationaleService,
    pub compose: ComposeService,
    pub evidence: EvidenceService,
    pub ingest: IngestService,
}

impl Services {
    /// Build with HTTP-backed model and embedder from config. Fails only
    /// if the vector store cannot reconstruct its on-disk state.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiCompatClient::from_config(config));
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
            config.embedding_base_url.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        ));
        Self::build(config, model, embedder)
    }

    /// Build with explicit model/embedder implementations (tests, local
    /// providers).
    pub fn build(
        config: &Config,
        model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let cache = Arc::new(ResponseCache::new());
        let metrics = Metrics::new();
        let jobs = Arc::new(JobTracker::new());
        let store = Arc::new(VectorStore::open(config.storage_dir.clone(), embedder)?);
        let enabled = config.cache_enabled;

        Ok(Self {
            extract: ExtractService::new(
                model.clone(),
                cache.clone(),
                metrics.clone(),
                enabled,
            ),
            rationale: crate::rationale::RationaleService::new(
                model.clone(),
                cache.clone(),
                metrics.clone(),
                enabled,
            ),
            compose: ComposeService::new(model, cache.clone(), metrics.clone(), enabled),
            evidence: EvidenceService::new(store.clone(), cache.clone(), metrics.clone(), enabled),
            ingest: IngestService::new(store.clone(), jobs.clone(), metrics.clone()),
            cache,
            metrics,
            jobs,
            store,
        })
    }

    /// Node-edit invalidation: composed prose that may have included the
    /// node is stale, everything else stays.
    pub fn on_node_edited(&self, _node_id: &str) {
        self.cache.invalidate_composition();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct TinyEmbedder;

    #[async_trait]
    impl Embedder for TinyEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct NoModel;

    #[async_trait]
    impl crate::llm::ChatModel for NoModel {
        async fn generate(&self, _: &str, _: &str, _: f32, _: u32) -> (String, bool) {
            (crate::llm::UNAVAILABLE_TEXT.to_string(), false)
        }
    }

    #[tokio::test]
    async fn end_to_end_degraded_path_never_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let services = Services::build(&config, Arc::new(NoModel), Arc::new(TinyEmbedder)).unwrap();

        // Extraction degrades to the sentence splitter.
        let outcome = services
            .extract
            .extract("One claim stands. Another follows.", Some("thesis"), 8)
            .await;
        assert!(!outcome.used_model);
        assert_eq!(outcome.nodes.len(), 3);

        // Composition degrades to the template.
        let (composition, used) = services
            .compose
            .compose(&crate::compose::ComposeRequest {
                thesis: Some("thesis".into()),
                nodes: outcome.nodes.clone(),
                edges: outcome.edges.clone(),
                words: 300,
                audience: "general".into(),
                tone: "neutral".into(),
            })
            .await;
        assert!(!used);
        assert!(composition.essay_md.starts_with("## thesis"));

        // Evidence search over an empty corpus is empty, not an error.
        let hits = services.evidence.search("anything", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn node_edit_clears_only_composition_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let services = Services::build(&config, Arc::new(NoModel), Arc::new(TinyEmbedder)).unwrap();

        services
            .cache
            .set("composition", "1.1.0", &["x"], serde_json::json!(1));
        services
            .cache
            .set("node_extraction", "2.0.0", &["x"], serde_json::json!(2));

        services.on_node_edited("n2");
        assert_eq!(services.cache.stats().total_entries, 1);
    }
}
