use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::triage::{
    Stage, StageContext, StageFailure, StageKind, StageOutput, WorkflowState,
};
use crate::domain::{Incident, SimilaritySearch};

pub const DEFAULT_SIMILAR_INCIDENTS: usize = 3;

/// Length of the top incident excerpt recorded in the finding
const EXCERPT_CHARS: usize = 100;

/// Queries past incidents similar to the alert. Always the first task.
#[derive(Clone)]
pub struct KnowledgeLookupStage {
    search: Arc<dyn SimilaritySearch>,
    k: usize,
}

impl std::fmt::Debug for KnowledgeLookupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeLookupStage")
            .field("k", &self.k)
            .finish_non_exhaustive()
    }
}

impl KnowledgeLookupStage {
    pub fn new(search: Arc<dyn SimilaritySearch>, k: usize) -> Self {
        Self { search, k }
    }

    /// Validate scores, order by descending similarity (ties by id) and
    /// collapse duplicate ids, keeping the best-scored entry.
    fn normalize(&self, mut incidents: Vec<Incident>) -> Result<Vec<Incident>, StageFailure> {
        if let Some(bad) = incidents.iter().find(|i| !i.has_valid_score()) {
            return Err(StageFailure::invalid_output(format!(
                "incident '{}' has similarity score {} outside 0.0-1.0",
                bad.id, bad.similarity_score
            )));
        }

        if let Some(bad) = incidents.iter().find(|i| i.id.trim().is_empty()) {
            return Err(StageFailure::invalid_output(format!(
                "incident with blank id (error: {})",
                bad.error_text
            )));
        }

        incidents.sort_by(|a, b| {
            b.similarity_score
                .total_cmp(&a.similarity_score)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut seen = HashSet::new();
        incidents.retain(|i| seen.insert(i.id.clone()));
        incidents.truncate(self.k);

        Ok(incidents)
    }
}

fn summarize(incidents: &[Incident]) -> String {
    let top = match incidents.first() {
        Some(incident) => {
            let excerpt: String = incident.error_text.chars().take(EXCERPT_CHARS).collect();
            format!("{}...", excerpt)
        }
        None => "None".to_string(),
    };

    format!(
        "Found {} similar past incidents. Top incident: {}",
        incidents.len(),
        top
    )
}

#[async_trait]
impl Stage for KnowledgeLookupStage {
    fn kind(&self) -> StageKind {
        StageKind::KnowledgeLookup
    }

    async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StageOutput, StageFailure> {
        let query = state.alert().search_query();
        let found = ctx
            .call("similarity_search", self.search.search(&query, self.k))
            .await?;

        let incidents = self.normalize(found)?;
        debug!(
            alert_id = %state.alert().id,
            found = incidents.len(),
            "Similar incidents retrieved"
        );

        let finding = summarize(&incidents);
        Ok(StageOutput::KnowledgeLookup { incidents, finding })
    }
}
