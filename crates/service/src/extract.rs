//! Node/edge extraction: cache -> model -> coercion -> normalization, with
//! a deterministic heuristic fallback. The worst case is lower-quality
//! sentence-split claims, never an error.

use crate::llm::ChatModel;
use crate::metrics::Metrics;
use crate::prompts::{self, NODE_EXTRACTION_VERSION, STRICT_JSON_SUFFIX};
use cache::ResponseCache;
use coerce::coerce_detailed;
use graph::{
    fallback_extract, normalize_entities, CandidateEdge, CandidateNode, ValidatedEdge,
    ValidatedNode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const OP: &str = "node_extraction";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOutcome {
    pub nodes: Vec<ValidatedNode>,
    pub edges: Vec<ValidatedEdge>,
    /// Whether the result came from a live model reply (as opposed to the
    /// heuristic fallback).
    pub used_model: bool,
}

pub struct ExtractService {
    model: Arc<dyn ChatModel>,
    cache: Arc<ResponseCache>,
    metrics: Arc<Metrics>,
    cache_enabled: bool,
}

impl ExtractService {
    pub fn new(
        model: Arc<dyn ChatModel>,
        cache: Arc<ResponseCache>,
        metrics: Arc<Metrics>,
        cache_enabled: bool,
    ) -> Self {
        Self {
            model,
            cache,
            metrics,
            cache_enabled,
        }
    }

    pub async fn extract(
        &self,
        text: &str,
        thesis: Option<&str>,
        max_items: usize,
    ) -> ExtractOutcome {
        self.metrics.record_extract_request();
        let max_items = max_items.clamp(1, 16);
        let max_str = max_items.to_string();
        let args = [text, thesis.unwrap_or(""), max_str.as_str()];

        if self.cache_enabled {
            if let Some(value) = self.cache.get(OP, NODE_EXTRACTION_VERSION, &args) {
                if let Ok(outcome) = serde_json::from_value::<ExtractOutcome>(value) {
                    return outcome;
                }
            }
        }

        let (system, user) = prompts::extraction_prompts(text, thesis, max_items);
        let system = format!("{system}{STRICT_JSON_SUFFIX}");
        let (raw, reached) = self.model.generate(&system, &user, 0.2, 1200).await;
        self.metrics.record_model_call(reached);

        let coerced = coerce_detailed(&raw);
        self.metrics.record_coercion(coerced.pass);

        let outcome = match coerced.record {
            Some(record) => {
                let node_candidates = CandidateNode::from_array(record.get("nodes"));
                let edge_candidates = CandidateEdge::from_array(record.get("edges"));
                let (nodes, edges) =
                    normalize_entities(&node_candidates, &edge_candidates, thesis, max_items);
                if nodes.is_empty() {
                    debug!("normalization kept zero nodes, using heuristic fallback");
                    let (nodes, edges) = fallback_extract(text, thesis, max_items);
                    ExtractOutcome {
                        nodes,
                        edges,
                        used_model: false,
                    }
                } else {
                    ExtractOutcome {
                        nodes,
                        edges,
                        used_model: true,
                    }
                }
            }
            None => {
                let (nodes, edges) = fallback_extract(text, thesis, max_items);
                ExtractOutcome {
                    nodes,
                    edges,
                    used_model: false,
                }
            }
        };

        // Only model-derived results are cached: a transport failure must
        // not pin the fallback until the TTL runs out.
        if self.cache_enabled && outcome.used_model {
            if let Ok(value) = serde_json::to_value(&outcome) {
                self.cache.set(OP, NODE_EXTRACTION_VERSION, &args, value);
            }
        }
        outcome
    }
}
