//! Deterministic heuristic extractor used when the model yields nothing
//! usable: sentence-split the source text into CLAIM nodes.

use crate::types::{NodeType, Relation, ValidatedEdge, ValidatedNode};

const MIN_SENTENCE_CHARS: usize = 5;

/// Naive sentence-split extraction. The pinned thesis, when given, comes
/// first; every claim gets a SUPPORTS edge to it. This is the only place
/// claim-to-thesis edges are synthesized — the normalizer never invents
/// edges.
pub fn fallback_extract(
    text: &str,
    thesis: Option<&str>,
    max_items: usize,
) -> (Vec<ValidatedNode>, Vec<ValidatedEdge>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut idx = 1usize;

    let mut thesis_id = None;
    if let Some(t) = thesis {
        let t = t.trim();
        if !t.is_empty() {
            let id = format!("n{idx}");
            idx += 1;
            nodes.push(ValidatedNode {
                id: id.clone(),
                text: t.to_string(),
                node_type: NodeType::Thesis,
            });
            thesis_id = Some(id);
        }
    }

    let mut seen = std::collections::HashSet::new();
    for sentence in split_sentences(text) {
        if nodes.len() >= max_items {
            break;
        }
        let cleaned = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.len() < MIN_SENTENCE_CHARS {
            continue;
        }
        if !seen.insert(cleaned.to_lowercase()) {
            continue;
        }

        let claim_id = format!("n{idx}");
        idx += 1;
        nodes.push(ValidatedNode {
            id: claim_id.clone(),
            text: cleaned,
            node_type: NodeType::Claim,
        });
        if let Some(tid) = &thesis_id {
            edges.push(ValidatedEdge {
                from_id: claim_id,
                to_id: tid.clone(),
                relation: Relation::Supports,
            });
        }
    }

    nodes.truncate(max_items);
    (nodes, edges)
}

/// Split after `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    out.push(&text[start..=i]);
                    start = i + c.len_utf8();
                }
            }
        }
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}
