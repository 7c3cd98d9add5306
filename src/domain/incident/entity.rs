use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A past incident returned by similarity search.
///
/// Serialized with the field names of the public recommendation payload
/// (`error`, `solution`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    #[serde(rename = "error")]
    pub error_text: String,
    #[serde(rename = "solution")]
    pub solution_text: String,
    /// Similarity to the query (0.0 - 1.0, higher is more similar)
    pub similarity_score: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Incident {
    pub fn new(
        id: impl Into<String>,
        error_text: impl Into<String>,
        solution_text: impl Into<String>,
        similarity_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            error_text: error_text.into(),
            solution_text: solution_text.into(),
            similarity_score,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn has_valid_score(&self) -> bool {
        (0.0..=1.0).contains(&self.similarity_score)
    }
}
