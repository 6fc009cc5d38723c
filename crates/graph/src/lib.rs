//! Graph entity validation: repairs, validates and deduplicates
//! model-proposed nodes and edges before they reach persistent storage.

pub mod fallback;
pub mod normalizer;
pub mod types;

pub use fallback::fallback_extract;
pub use normalizer::normalize_entities;
pub use types::{
    CandidateEdge, CandidateNode, NodeType, Relation, ValidatedEdge, ValidatedNode,
};
