//! Composition of an outline + essay from the selected subgraph.
//!
//! Ladder: cached -> model JSON -> salvage (model replied, JSON unusable)
//! -> deterministic template. Always returns a valid body; the flag says
//! whether a real model reply was used, even if salvaged.

use crate::llm::ChatModel;
use crate::metrics::Metrics;
use crate::prompts::{self, COMPOSITION_VERSION};
use cache::ResponseCache;
use coerce::coerce_detailed;
use graph::{ValidatedEdge, ValidatedNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const OP: &str = "composition";
const SALVAGE_POINTS: usize = 5;

#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub thesis: Option<String>,
    pub nodes: Vec<ValidatedNode>,
    pub edges: Vec<ValidatedEdge>,
    pub words: u32,
    pub audience: String,
    pub tone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    pub heading: String,
    pub points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composition {
    pub outline: Vec<OutlineSection>,
    pub essay_md: String,
}

pub struct ComposeService {
    model: Arc<dyn ChatModel>,
    cache: Arc<ResponseCache>,
    metrics: Arc<Metrics>,
    cache_enabled: bool,
}

impl ComposeService {
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

    /// Always returns `(composition, used_model)`; never errors.
    pub async fn compose(&self, request: &ComposeRequest) -> (Composition, bool) {
        let words = request.words.to_string();
        let node_digest = request
            .nodes
            .iter()
            .map(|n| n.text.as_str())
            .collect::<Vec<_>>()
            .join("\u{1f}");
        let thesis = request.thesis.as_deref().unwrap_or("");
        let args = [
            thesis,
            node_digest.as_str(),
            words.as_str(),
            request.audience.as_str(),
            request.tone.as_str(),
        ];

        if self.cache_enabled {
            if let Some(value) = self.cache.get(OP, COMPOSITION_VERSION, &args) {
                if let Ok(composition) = serde_json::from_value::<Composition>(value) {
                    return (composition, true);
                }
            }
        }

        let (system, user) = prompts::composition_prompts(
            request.thesis.as_deref(),
            &request.nodes,
            request.words,
            &request.audience,
            &request.tone,
        );
        let (raw, reached) = self.model.generate(&system, &user, 0.5, 1800).await;
        self.metrics.record_model_call(reached);

        let coerced = coerce_detailed(&raw);
        self.metrics.record_coercion(coerced.pass);

        if let Some(record) = coerced.record {
            if let Some(composition) = parse_composition(&record) {
                if self.cache_enabled {
                    if let Ok(value) = serde_json::to_value(&composition) {
                        self.cache.set(OP, COMPOSITION_VERSION, &args, value);
                    }
                }
                return (composition, reached);
            }
        }

        // Salvage: the model said something, just not the JSON we asked
        // for. Keep its text as the essay so the reply is not wasted.
        if reached && !raw.trim().is_empty() {
            return (
                Composition {
                    outline: template_outline(request),
                    essay_md: raw,
                },
                true,
            );
        }

        (deterministic_composition(request), false)
    }
}

fn parse_composition(record: &coerce::CoercedRecord) -> Option<Composition> {
    let outline_raw = record.get("outline")?.as_array()?;
    let essay_md = record.get("essay_md")?.as_str()?.to_string();
    if essay_md.is_empty() {
        return None;
    }

    let outline: Vec<OutlineSection> = outline_raw
        .iter()
        .filter_map(|section| {
            let heading = section.get("heading")?.as_str()?.to_string();
            let points = section
                .get("points")
                .and_then(Value::as_array)
                .map(|pts| {
                    pts.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(OutlineSection { heading, points })
        })
        .collect();

    if outline.is_empty() {
        return None;
    }
    Some(Composition { outline, essay_md })
}

fn template_outline(request: &ComposeRequest) -> Vec<OutlineSection> {
    let heading = request
        .thesis
        .clone()
        .unwrap_or_else(|| "Argument Overview".to_string());
    let points: Vec<String> = request
        .nodes
        .iter()
        .map(|n| n.text.clone())
        .filter(|t| !t.is_empty())
        .take(SALVAGE_POINTS)
        .collect();
    vec![OutlineSection { heading, points }]
}

/// True deterministic fallback: no model was reached.
fn deterministic_composition(request: &ComposeRequest) -> Composition {
    let outline = template_outline(request);
    let heading = &outline[0].heading;
    let bullets: String = outline[0]
        .points
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    Composition {
        essay_md: format!("## {heading}\n\n{bullets}"),
        outline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use graph::NodeType;

    fn request() -> ComposeRequest {
        ComposeRequest {
            thesis: Some("Warming is man-made".into()),
            nodes: vec![
                ValidatedNode {
                    id: "n1".into(),
                    text: "Warming is man-made".into(),
                    node_type: NodeType::Thesis,
                },
                ValidatedNode {
                    id: "n2".into(),
                    text: "CO2 traps heat".into(),
                    node_type: NodeType::Claim,
                },
            ],
            edges: vec![],
            words: 700,
            audience: "academic".into(),
            tone: "neutral".into(),
        }
    }

    fn service(text: &str, reached: bool) -> ComposeService {
        ComposeService::new(
            Arc::new(ScriptedModel {
                text: text.to_string(),
                reached,
            }),
            Arc::new(ResponseCache::new()),
            Metrics::new(),
            true,
        )
    }

    #[tokio::test]
    async fn wellformed_reply_is_parsed() {
        let reply = r###"{"outline": [{"heading": "Intro", "points": ["p1"]}],
                        "essay_md": "## Intro\n\nBody."}"###;
        let (composition, used) = service(reply, true).compose(&request()).await;
        assert!(used);
        assert_eq!(composition.outline.len(), 1);
        assert_eq!(composition.outline[0].heading, "Intro");
        assert!(composition.essay_md.starts_with("## Intro"));
    }

    #[tokio::test]
    async fn prose_reply_is_salvaged_and_counts_as_model_used() {
        let (composition, used) = service("Here is an essay without JSON.", true)
            .compose(&request())
            .await;
        assert!(used);
        assert_eq!(composition.essay_md, "Here is an essay without JSON.");
        assert_eq!(composition.outline[0].heading, "Warming is man-made");
        assert_eq!(composition.outline[0].points.len(), 2);
    }

    #[tokio::test]
    async fn unreachable_model_yields_deterministic_template() {
        let (composition, used) = service(crate::llm::UNAVAILABLE_TEXT, false)
            .compose(&request())
            .await;
        assert!(!used);
        assert!(composition.essay_md.starts_with("## Warming is man-made"));
        assert!(composition.essay_md.contains("- CO2 traps heat"));
    }

    #[tokio::test]
    async fn parsed_compositions_are_cached() {
        let cache = Arc::new(ResponseCache::new());
        let metrics = Metrics::new();
        let svc = ComposeService::new(
            Arc::new(ScriptedModel {
                text: r#"{"outline": [{"heading": "H", "points": []}], "essay_md": "E"}"#.into(),
                reached: true,
            }),
            cache,
            metrics.clone(),
            true,
        );

        let req = request();
        let _ = svc.compose(&req).await;
        let _ = svc.compose(&req).await;
        assert_eq!(metrics.snapshot().model_replies, 1);
    }

    #[tokio::test]
    async fn missing_essay_md_falls_through_to_salvage() {
        let (composition, used) = service(r#"{"outline": [{"heading": "H"}]}"#, true)
            .compose(&request())
            .await;
        assert!(used);
        // Raw text kept as the essay.
        assert!(composition.essay_md.contains("outline"));
    }
}
