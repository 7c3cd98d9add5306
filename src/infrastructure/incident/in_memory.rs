//! In-memory incident index for development and testing
//!
//! Scores incidents by token overlap (Jaccard) between the query and the
//! incident's error text. Stands in for a vector store.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{DomainError, Incident, SimilaritySearch};

/// An incident as stored in the corpus file
#[derive(Debug, Clone, Deserialize)]
struct IncidentRecord {
    id: String,
    error: String,
    solution: String,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
struct IndexedIncident {
    record: IncidentRecord,
    tokens: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryIncidentIndex {
    incidents: Vec<IndexedIncident>,
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }

    a.intersection(b).count() as f64 / union as f64
}

impl InMemoryIncidentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an incident to the index. An existing entry with the same id is replaced.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        error: impl Into<String>,
        solution: impl Into<String>,
    ) {
        self.insert_record(IncidentRecord {
            id: id.into(),
            error: error.into(),
            solution: solution.into(),
            metadata: BTreeMap::new(),
        });
    }

    fn insert_record(&mut self, record: IncidentRecord) {
        self.incidents.retain(|i| i.record.id != record.id);
        let tokens = tokenize(&record.error);
        self.incidents.push(IndexedIncident { record, tokens });
    }

    /// Build an index from a JSON array of `{id, error, solution, metadata?}`
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let records: Vec<IncidentRecord> = serde_json::from_str(json).map_err(|e| {
            DomainError::configuration(format!("Invalid incident corpus: {}", e))
        })?;

        let mut index = Self::new();
        for record in records {
            index.insert_record(record);
        }

        Ok(index)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read incident corpus {}: {}",
                path.display(),
                e
            ))
        })?;

        let index = Self::from_json(&contents)?;
        info!(path = %path.display(), incidents = index.len(), "Loaded incident corpus");

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

#[async_trait]
impl SimilaritySearch for InMemoryIncidentIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Incident>, DomainError> {
        let query_tokens = tokenize(query);

        let mut scored: Vec<Incident> = self
            .incidents
            .iter()
            .filter_map(|indexed| {
                let score = jaccard(&query_tokens, &indexed.tokens);
                if score <= 0.0 {
                    return None;
                }

                let record = &indexed.record;
                let mut incident =
                    Incident::new(&record.id, &record.error, &record.solution, score);
                incident.metadata = record.metadata.clone();
                Some(incident)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity_score
                .total_cmp(&a.similarity_score)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(k);

        debug!(query, k, matches = scored.len(), "Incident index searched");

        Ok(scored)
    }
}
