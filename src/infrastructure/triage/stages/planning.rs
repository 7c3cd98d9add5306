use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::complete_non_blank;
use crate::domain::triage::{
    Plan, Stage, StageContext, StageFailure, StageKind, StageOutput, WorkflowState,
    MIN_PLAN_TASKS,
};
use crate::domain::{CompletionClient, CompletionParams};
use crate::infrastructure::triage::prompts;

/// Numbered (`1.`, `1)`) or bulleted (`-`, `*`) list items
static TASK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(.+?)\s*$").unwrap());

/// Minimum task lines a completion must yield to count as a plan
const MIN_PARSED_TASKS: usize = 2;

/// Extract task descriptions from list-formatted text.
///
/// Lines that are not list items are ignored; markdown emphasis is stripped.
pub fn parse_plan_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| TASK_LINE.captures(line))
        .map(|cap| cap[1].replace("**", "").replace('`', "").trim().to_string())
        .filter(|task| !task.is_empty())
        .collect()
}

/// Turns the alert into an ordered investigation plan
#[derive(Debug)]
pub struct PlanningStage {
    completion: Arc<dyn CompletionClient>,
    params: CompletionParams,
    max_tasks: usize,
}

impl PlanningStage {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        params: CompletionParams,
        max_tasks: usize,
    ) -> Self {
        Self {
            completion,
            params,
            max_tasks,
        }
    }
}

#[async_trait]
impl Stage for PlanningStage {
    fn kind(&self) -> StageKind {
        StageKind::Planning
    }

    async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StageOutput, StageFailure> {
        let prompt = prompts::planning(state, self.max_tasks)?;
        let text = complete_non_blank(
            self.completion.as_ref(),
            ctx,
            &prompt,
            self.params,
            "Plan",
        )
        .await
        .map_err(|e| match e {
            StageFailure::InvalidOutput(message) => StageFailure::InvalidPlan(message),
            other => other,
        })?;

        let tasks = parse_plan_lines(&text);
        if tasks.len() < MIN_PARSED_TASKS {
            return Err(StageFailure::invalid_plan(format!(
                "expected at least {} task lines, got {}",
                MIN_PARSED_TASKS,
                tasks.len()
            )));
        }

        let plan = Plan::with_knowledge_lookup(tasks, self.max_tasks);
        if plan.len() < MIN_PLAN_TASKS {
            return Err(StageFailure::invalid_plan(format!(
                "expected at least {} plan entries after deduplication, got {}",
                MIN_PLAN_TASKS,
                plan.len()
            )));
        }

        debug!(alert_id = %state.alert().id, tasks = plan.len(), "Plan created");

        Ok(StageOutput::Plan(plan))
    }
}
