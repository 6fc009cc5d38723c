use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Allowed node kinds. THESIS is reserved for the pinned main argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Thesis,
    Claim,
    Evidence,
    Variable,
}

impl NodeType {
    /// Case-normalized parse; anything outside the enumeration is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "THESIS" => Some(Self::Thesis),
            "CLAIM" => Some(Self::Claim),
            "EVIDENCE" => Some(Self::Evidence),
            "VARIABLE" => Some(Self::Variable),
            _ => None,
        }
    }
}

/// Allowed edge relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    Supports,
    Contradicts,
    Defines,
}

impl Relation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUPPORTS" => Some(Self::Supports),
            "CONTRADICTS" => Some(Self::Contradicts),
            "DEFINES" => Some(Self::Defines),
            _ => None,
        }
    }
}

/// Untrusted node proposed by the model. Fields of the wrong JSON type are
/// treated as absent rather than failing the whole payload.
#[derive(Debug, Clone, Default)]
pub struct CandidateNode {
    pub id: Option<String>,
    pub text: Option<String>,
    pub node_type: Option<String>,
}

impl CandidateNode {
    pub fn from_value(v: &Value) -> Self {
        Self {
            id: str_field(v, "id"),
            text: str_field(v, "text"),
            node_type: str_field(v, "type"),
        }
    }

    /// Leniently read a candidate list from a coerced record field.
    /// A missing or non-array value yields an empty list.
    pub fn from_array(v: Option<&Value>) -> Vec<Self> {
        v.and_then(Value::as_array)
            .map(|items| items.iter().map(Self::from_value).collect())
            .unwrap_or_default()
    }
}

/// Untrusted edge proposed by the model.
#[derive(Debug, Clone, Default)]
pub struct CandidateEdge {
    pub from_id: Option<String>,
    pub to_id: Option<String>,
    pub relation: Option<String>,
}

impl CandidateEdge {
    pub fn from_value(v: &Value) -> Self {
        Self {
            from_id: str_field(v, "from_id"),
            to_id: str_field(v, "to_id"),
            relation: str_field(v, "relation"),
        }
    }

    pub fn from_array(v: Option<&Value>) -> Vec<Self> {
        v.and_then(Value::as_array)
            .map(|items| items.iter().map(Self::from_value).collect())
            .unwrap_or_default()
    }
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Canonicalized node: id matches `n<k>`, type is enumerated, text trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedNode {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

/// Canonicalized edge: both endpoints exist, relation enumerated, no
/// self-loops, no duplicate triples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedEdge {
    pub from_id: String,
    pub to_id: String,
    pub relation: Relation,
}
