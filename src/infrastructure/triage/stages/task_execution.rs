use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::complete_non_blank;
use crate::domain::triage::{
    Stage, StageContext, StageFailure, StageKind, StageOutput, WorkflowState,
};
use crate::domain::{CompletionClient, CompletionParams};
use crate::infrastructure::triage::prompts;

/// Runs the next plan task and records a narrative finding
#[derive(Debug)]
pub struct TaskExecutionStage {
    completion: Arc<dyn CompletionClient>,
    params: CompletionParams,
}

impl TaskExecutionStage {
    pub fn new(completion: Arc<dyn CompletionClient>, params: CompletionParams) -> Self {
        Self { completion, params }
    }
}

#[async_trait]
impl Stage for TaskExecutionStage {
    fn kind(&self) -> StageKind {
        StageKind::TaskExecution
    }

    async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StageOutput, StageFailure> {
        let task_index = state.next_task_index();
        let task = state
            .plan()
            .and_then(|plan| plan.get(task_index))
            .ok_or_else(|| {
                StageFailure::invariant(format!("no plan task at index {}", task_index))
            })?;

        debug!(alert_id = %state.alert().id, task_index, task, "Executing task");

        let prompt = prompts::task_execution(state, task)?;
        let finding =
            complete_non_blank(self.completion.as_ref(), ctx, &prompt, self.params, "Finding")
                .await?;

        Ok(StageOutput::Finding {
            task_index,
            finding,
        })
    }
}
