//! Validation and repair of model-proposed nodes and edges.
//!
//! Never errors: semantically invalid candidates are silently filtered, and
//! an empty candidate list yields an empty (or pinned-only) result.

use crate::types::{
    CandidateEdge, CandidateNode, NodeType, Relation, ValidatedEdge, ValidatedNode,
};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i)n\d+$").unwrap())
}

/// Validate and coerce candidates into clean nodes and edges:
/// - a pinned thesis, when given, is emitted first as the THESIS node
/// - at most one THESIS per response
/// - nodes deduplicated on (type, lowercased-trimmed text), first wins
/// - ids kept only when they match `n<k>` and are unused; otherwise a fresh
///   sequential id is minted
/// - at most `max_items` nodes, pinned thesis included
/// - edges kept only when both endpoints validate, the relation is
///   enumerated, and they are neither self-loops nor duplicate triples
pub fn normalize_entities(
    candidate_nodes: &[CandidateNode],
    candidate_edges: &[CandidateEdge],
    pinned_thesis: Option<&str>,
    max_items: usize,
) -> (Vec<ValidatedNode>, Vec<ValidatedEdge>) {
    let nodes = normalize_nodes(candidate_nodes, pinned_thesis, max_items);
    let edges = normalize_edges(candidate_edges, &nodes);
    debug!(
        candidates = candidate_nodes.len(),
        kept_nodes = nodes.len(),
        kept_edges = edges.len(),
        "normalized entities"
    );
    (nodes, edges)
}

fn normalize_nodes(
    candidates: &[CandidateNode],
    pinned_thesis: Option<&str>,
    max_items: usize,
) -> Vec<ValidatedNode> {
    let mut out: Vec<ValidatedNode> = Vec::new();
    let mut seen_type_text: HashSet<(NodeType, String)> = HashSet::new();
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut next_idx = 1usize;

    let mut mint_id = |used: &mut HashSet<String>| loop {
        let id = format!("n{next_idx}");
        next_idx += 1;
        if used.insert(id.clone()) {
            return id;
        }
    };

    // The externally supplied thesis is pinned first, before any candidate.
    let mut thesis_taken = false;
    if let Some(thesis) = pinned_thesis {
        let text = thesis.trim();
        if !text.is_empty() {
            let id = mint_id(&mut used_ids);
            seen_type_text.insert((NodeType::Thesis, text.to_lowercase()));
            out.push(ValidatedNode {
                id,
                text: text.to_string(),
                node_type: NodeType::Thesis,
            });
            thesis_taken = true;
        }
    }

    for candidate in candidates {
        if out.len() >= max_items {
            break;
        }

        let text = candidate.text.as_deref().unwrap_or("").trim().to_string();
        if text.is_empty() {
            continue;
        }
        // A missing type defaults to CLAIM; an unknown one drops the node.
        let Some(node_type) = NodeType::parse(candidate.node_type.as_deref().unwrap_or("CLAIM"))
        else {
            continue;
        };

        // Only one THESIS per response.
        if node_type == NodeType::Thesis && thesis_taken {
            continue;
        }

        let key = (node_type, text.to_lowercase());
        if !seen_type_text.insert(key) {
            continue;
        }

        let proposed = candidate
            .id
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        let id = if id_re().is_match(&proposed) && used_ids.insert(proposed.clone()) {
            proposed
        } else {
            mint_id(&mut used_ids)
        };

        if node_type == NodeType::Thesis {
            thesis_taken = true;
        }
        out.push(ValidatedNode {
            id,
            text,
            node_type,
        });
    }

    out.truncate(max_items);
    out
}

fn normalize_edges(candidates: &[CandidateEdge], nodes: &[ValidatedNode]) -> Vec<ValidatedEdge> {
    let valid_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut seen: HashSet<(String, String, Relation)> = HashSet::new();
    let mut out = Vec::new();

    for candidate in candidates {
        let from_id = candidate
            .from_id
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        let to_id = candidate
            .to_id
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        if from_id.is_empty() || to_id.is_empty() || from_id == to_id {
            continue;
        }
        if !valid_ids.contains(from_id.as_str()) || !valid_ids.contains(to_id.as_str()) {
            continue;
        }
        // A missing relation defaults to SUPPORTS; an unknown one drops the edge.
        let Some(relation) = Relation::parse(candidate.relation.as_deref().unwrap_or("SUPPORTS"))
        else {
            continue;
        };

        if !seen.insert((from_id.clone(), to_id.clone(), relation)) {
            continue;
        }
        out.push(ValidatedEdge {
            from_id,
            to_id,
            relation,
        });
    }

    out
}
