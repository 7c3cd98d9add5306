use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::complete_non_blank;
use crate::domain::triage::{
    Recommendation, Stage, StageContext, StageFailure, StageKind, StageOutput, WorkflowState,
};
use crate::domain::{CompletionClient, CompletionParams};
use crate::infrastructure::triage::prompts;

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[incident:\s*([^\]\s]+)\s*\]").unwrap());

/// Incident ids cited in the text, in first-citation order
pub fn cited_incident_ids(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();

    CITATION
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Synthesizes the investigation into the terminal recommendation
#[derive(Debug)]
pub struct RecommendationStage {
    completion: Arc<dyn CompletionClient>,
    params: CompletionParams,
}

impl RecommendationStage {
    pub fn new(completion: Arc<dyn CompletionClient>, params: CompletionParams) -> Self {
        Self { completion, params }
    }
}

#[async_trait]
impl Stage for RecommendationStage {
    fn kind(&self) -> StageKind {
        StageKind::Recommendation
    }

    async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StageOutput, StageFailure> {
        let prompt = prompts::recommendation(state)?;
        let text = complete_non_blank(
            self.completion.as_ref(),
            ctx,
            &prompt,
            self.params,
            "Recommendation",
        )
        .await?;

        let cited = cited_incident_ids(&text);
        let known: HashSet<&str> = state
            .similar_incidents()
            .iter()
            .map(|i| i.id.as_str())
            .collect();

        if let Some(unknown) = cited.iter().find(|id| !known.contains(id.as_str())) {
            return Err(StageFailure::invalid_output(format!(
                "recommendation cites unknown incident '{}'",
                unknown
            )));
        }

        // Without citations the recommendation draws on every similar incident
        let similar_incidents = if cited.is_empty() {
            state.similar_incidents().to_vec()
        } else {
            state
                .similar_incidents()
                .iter()
                .filter(|i| cited.contains(&i.id))
                .cloned()
                .collect()
        };

        debug!(
            alert_id = %state.alert().id,
            cited = cited.len(),
            referenced = similar_incidents.len(),
            "Recommendation synthesized"
        );

        let alert = state.alert();
        Ok(StageOutput::Recommendation(Recommendation {
            alert_id: alert.id.clone(),
            alert_type: alert.alert_type.clone(),
            recommendation_text: text,
            similar_incidents,
            completed_tasks: state.completed_tasks(),
        }))
    }
}
