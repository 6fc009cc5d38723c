//! Prompt builders and the prompt version registry.
//!
//! Versions are baked into cache keys so a prompt revision invalidates
//! previously cached answers instead of serving output shaped by an older
//! instruction set.

use graph::ValidatedNode;

pub const NODE_EXTRACTION_VERSION: &str = "2.0.0";
pub const EDGE_RATIONALE_VERSION: &str = "2.0.0";
pub const COMPOSITION_VERSION: &str = "1.1.0";

/// Appended to every system prompt that expects structured output.
pub const STRICT_JSON_SUFFIX: &str =
    "\nReturn ONLY a single valid JSON object. Start with '{' and end with '}'.";

/// System + user prompt for node/edge extraction from free text.
pub fn extraction_prompts(text: &str, thesis: Option<&str>, max_items: usize) -> (String, String) {
    let system = concat!(
        "You are an information extraction model specializing in factual claim extraction. ",
        "Extract atomic, self-contained, verifiable claims, evidence, and variables from the passage. ",
        "Node types: THESIS (the main argument, only if provided), CLAIM (a declarative assertion), ",
        "EVIDENCE (data, quotes, statistics), VARIABLE (a measurable concept). ",
        "Relations: SUPPORTS (evidence supports a claim, or a claim supports the thesis), ",
        "CONTRADICTS, DEFINES (evidence defines or measures a variable). ",
        "Each claim must be entailed by the source text, self-contained, and keep its qualifiers. ",
        "Return output in STRICT JSON ONLY - no prose, no code fences.",
    )
    .to_string();

    let user = format!(
        "Text:\n{text}\n\n\
         Thesis (optional):\n{thesis}\n\n\
         Instructions:\n\
         - Extract up to {max_items} items total (claims + evidence + variables).\n\
         - If a thesis is provided, include exactly one node of type \"THESIS\" using that text.\n\
         - Use ids 'n1','n2','n3'... for nodes in order.\n\
         - Create edges connecting evidence to claims (SUPPORTS) and evidence to variables (DEFINES).\n\n\
         Return strict JSON (no extra keys):\n\
         {{\"nodes\":[{{\"id\":\"n1\",\"type\":\"CLAIM\",\"text\":\"...\"}}],\
         \"edges\":[{{\"from_id\":\"n2\",\"to_id\":\"n1\",\"relation\":\"SUPPORTS\"}}]}}",
        thesis = thesis.unwrap_or(""),
    );

    (system, user)
}

/// System + user prompt for the A -> B causal reason card.
pub fn rationale_prompts(a_name: &str, b_name: &str) -> (String, String) {
    let system = concat!(
        "You analyze a proposed causal edge A -> B and list mechanisms, assumptions, ",
        "confounders, and prior evidence types. Return STRICT JSON ONLY: ",
        "{\"mechanisms\":[],\"assumptions\":[],\"likely_confounders\":[],\"prior_evidence_types\":[]}.",
    )
    .to_string();

    let user = format!(
        "Proposed causal edge: \"{a_name}\" -> \"{b_name}\".\n\
         List 2-4 short entries per field. Keep each under 15 words."
    );

    (system, user)
}

/// System + user prompt for composing an outline + essay from a subgraph.
pub fn composition_prompts(
    thesis: Option<&str>,
    nodes: &[ValidatedNode],
    words: u32,
    audience: &str,
    tone: &str,
) -> (String, String) {
    let system = concat!(
        "You are a careful reasoning assistant. Return STRICT JSON ONLY: ",
        "{\"outline\":[{\"heading\":\"...\",\"points\":[\"...\"]}],\"essay_md\":\"...\"}. ",
        "No extra text.",
    )
    .to_string();

    let node_lines: String = nodes
        .iter()
        .filter(|n| !n.text.is_empty())
        .map(|n| format!("- {}\n", n.text))
        .collect();

    let user = format!(
        "Thesis: {thesis}\n\n\
         Claims:\n{node_lines}\n\
         Audience: {audience}\nTone: {tone}\nTargetWords: {words}\n\
         Write the outline (3-6 sections) and a concise markdown essay integrating the claims. \
         Return ONLY the strict JSON object.",
        thesis = thesis.unwrap_or(""),
    );

    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph::NodeType;

    #[test]
    fn extraction_prompt_carries_item_limit_and_thesis() {
        let (system, user) = extraction_prompts("some passage", Some("the thesis"), 8);
        assert!(system.contains("STRICT JSON"));
        assert!(user.contains("up to 8 items"));
        assert!(user.contains("the thesis"));
    }

    #[test]
    fn composition_prompt_lists_node_texts() {
        let nodes = vec![ValidatedNode {
            id: "n1".into(),
            text: "claim one".into(),
            node_type: NodeType::Claim,
        }];
        let (_, user) = composition_prompts(Some("t"), &nodes, 700, "academic", "neutral");
        assert!(user.contains("- claim one"));
        assert!(user.contains("TargetWords: 700"));
    }
}
