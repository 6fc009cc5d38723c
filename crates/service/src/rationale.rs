//! Reason card for a proposed causal edge A -> B.

use crate::llm::ChatModel;
use crate::metrics::Metrics;
use crate::prompts::{self, EDGE_RATIONALE_VERSION, STRICT_JSON_SUFFIX};
use cache::ResponseCache;
use coerce::coerce_detailed;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const OP: &str = "edge_rationale";
/// Keep cards compact; the model sometimes pads lists.
const MAX_ENTRIES_PER_FIELD: usize = 8;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RationaleCard {
    pub mechanisms: Vec<String>,
    pub assumptions: Vec<String>,
    pub likely_confounders: Vec<String>,
    pub prior_evidence_types: Vec<String>,
}

impl RationaleCard {
    /// Generic card returned when no usable model reply exists. Vague on
    /// purpose: it prompts the user to fill in specifics rather than
    /// presenting an empty panel.
    pub fn placeholder() -> Self {
        Self {
            mechanisms: vec!["plausible pathway".to_string()],
            assumptions: vec!["ceteris paribus".to_string()],
            likely_confounders: vec!["baseline differences".to_string()],
            prior_evidence_types: vec![
                "observational".to_string(),
                "experimental".to_string(),
            ],
        }
    }
}

pub struct RationaleService {
    model: Arc<dyn ChatModel>,
    cache: Arc<ResponseCache>,
    metrics: Arc<Metrics>,
    cache_enabled: bool,
}

impl RationaleService {
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

    /// Returns the card and whether a live model reply produced it. An
    /// unreachable or incoherent model yields the placeholder card, never
    /// an error.
    pub async fn rationale(&self, a_name: &str, b_name: &str) -> (RationaleCard, bool) {
        let args = [a_name, b_name];
        if self.cache_enabled {
            if let Some(value) = self.cache.get(OP, EDGE_RATIONALE_VERSION, &args) {
                if let Ok(card) = serde_json::from_value::<RationaleCard>(value) {
                    return (card, true);
                }
            }
        }

        let (system, user) = prompts::rationale_prompts(a_name, b_name);
        let system = format!("{system}{STRICT_JSON_SUFFIX}");
        let (raw, reached) = self.model.generate(&system, &user, 0.2, 800).await;
        self.metrics.record_model_call(reached);

        let coerced = coerce_detailed(&raw);
        self.metrics.record_coercion(coerced.pass);

        let Some(record) = coerced.record else {
            return (RationaleCard::placeholder(), false);
        };

        let card = RationaleCard {
            mechanisms: string_list(record.get("mechanisms")),
            assumptions: string_list(record.get("assumptions")),
            likely_confounders: string_list(record.get("likely_confounders")),
            prior_evidence_types: string_list(record.get("prior_evidence_types")),
        };

        if self.cache_enabled {
            if let Ok(value) = serde_json::to_value(&card) {
                self.cache.set(OP, EDGE_RATIONALE_VERSION, &args, value);
            }
        }
        (card, true)
    }
}

/// Lenient string-array read: non-array fields are empty, non-string
/// entries are skipped, entries are trimmed and capped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(MAX_ENTRIES_PER_FIELD)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;

    fn service(text: &str, reached: bool) -> RationaleService {
        RationaleService::new(
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
    async fn parses_all_four_fields_leniently() {
        let reply = r#"{"mechanisms": ["m1", "", 42, "m2"],
                        "assumptions": "not a list",
                        "likely_confounders": ["c1"],
                        "prior_evidence_types": []}"#;
        let (card, used) = service(reply, true).rationale("A", "B").await;
        assert!(used);
        assert_eq!(card.mechanisms, vec!["m1", "m2"]);
        assert!(card.assumptions.is_empty());
        assert_eq!(card.likely_confounders, vec!["c1"]);
    }

    #[tokio::test]
    async fn unreachable_model_yields_placeholder_card() {
        let (card, used) = service(crate::llm::UNAVAILABLE_TEXT, false)
            .rationale("A", "B")
            .await;
        assert!(!used);
        assert_eq!(card.mechanisms, vec!["plausible pathway"]);
        assert_eq!(card.assumptions, vec!["ceteris paribus"]);
        assert_eq!(card.likely_confounders, vec!["baseline differences"]);
        assert_eq!(
            card.prior_evidence_types,
            vec!["observational", "experimental"]
        );
    }

    #[tokio::test]
    async fn incoherent_reply_also_yields_placeholder_card() {
        let (card, used) = service("no json here at all", true).rationale("A", "B").await;
        assert!(!used);
        assert_eq!(card.mechanisms, vec!["plausible pathway"]);
    }

    #[tokio::test]
    async fn entries_are_capped() {
        let many: Vec<String> = (0..10).map(|i| format!("\"m{i}\"")).collect();
        let reply = format!(
            r#"{{"mechanisms": [{}], "assumptions": [], "likely_confounders": [], "prior_evidence_types": []}}"#,
            many.join(",")
        );
        let (card, _) = service(&reply, true).rationale("A", "B").await;
        assert_eq!(card.mechanisms.len(), MAX_ENTRIES_PER_FIELD);
    }
}
