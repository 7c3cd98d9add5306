use std::sync::Arc;

use async_trait::async_trait;

use super::complete_non_blank;
use crate::domain::triage::{
    Stage, StageContext, StageFailure, StageKind, StageOutput, WorkflowState,
};
use crate::domain::{CompletionClient, CompletionParams};
use crate::infrastructure::triage::prompts;

/// Reviews the latest finding. Never alters the plan.
#[derive(Debug)]
pub struct ReflectionStage {
    completion: Arc<dyn CompletionClient>,
    params: CompletionParams,
}

impl ReflectionStage {
    pub fn new(completion: Arc<dyn CompletionClient>, params: CompletionParams) -> Self {
        Self { completion, params }
    }
}

#[async_trait]
impl Stage for ReflectionStage {
    fn kind(&self) -> StageKind {
        StageKind::Reflection
    }

    async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StageOutput, StageFailure> {
        let task_index = state
            .latest_completed_index()
            .ok_or_else(|| StageFailure::invariant("no completed task to reflect upon"))?;

        let task = state
            .plan()
            .and_then(|plan| plan.get(task_index))
            .ok_or_else(|| {
                StageFailure::invariant(format!("no plan task at index {}", task_index))
            })?;
        let task_result = state
            .task_result(task_index)
            .ok_or_else(|| StageFailure::invariant(format!("no result for task {}", task_index)))?;

        let prompt = prompts::reflection(state, task, task_result)?;
        let reflection =
            complete_non_blank(self.completion.as_ref(), ctx, &prompt, self.params, "Reflection")
                .await?;

        Ok(StageOutput::Reflection {
            task_index,
            reflection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::ScriptedCompletion;
    use super::*;
    use crate::domain::triage::{Alert, Plan, KNOWLEDGE_LOOKUP_TASK};
    use crate::domain::DomainError;
    use serde_json::Map;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> StageContext {
        StageContext::new(CancellationToken::new(), Duration::from_secs(5))
    }

    fn state_after_lookup() -> WorkflowState {
        let mut state = WorkflowState::new(
            Alert::new("a1", "PodCrashLoop", "Pod api in prod", "OOMKilled"),
            Map::new(),
        );
        state
            .apply(StageOutput::Plan(Plan::with_knowledge_lookup(
                vec!["Inspect logs".to_string(), "Check limits".to_string()],
                5,
            )))
            .unwrap();
        state
            .apply(StageOutput::KnowledgeLookup {
                incidents: vec![],
                finding: "Found 0 similar past incidents. Top incident: None".to_string(),
            })
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_reflects_on_latest_task() {
        let stage = ReflectionStage::new(
            Arc::new(ScriptedCompletion::new("", "")),
            CompletionParams::default(),
        );

        let output = stage.execute(&state_after_lookup(), &ctx()).await.unwrap();
        assert_eq!(
            output,
            StageOutput::Reflection {
                task_index: 0,
                reflection: format!("Reflected on: {}", KNOWLEDGE_LOOKUP_TASK),
            }
        );
    }

    #[derive(Debug)]
    struct BlankCompletion;

    #[async_trait]
    impl CompletionClient for BlankCompletion {
        async fn complete(
            &self,
            _prompt: &str,
            _params: CompletionParams,
        ) -> Result<String, DomainError> {
            Ok("  \n ".to_string())
        }
    }

    #[tokio::test]
    async fn test_blank_reflection_rejected() {
        let stage = ReflectionStage::new(Arc::new(BlankCompletion), CompletionParams::default());

        let err = stage.execute(&state_after_lookup(), &ctx()).await.unwrap_err();
        assert!(matches!(err, StageFailure::InvalidOutput(_)));
    }
}
