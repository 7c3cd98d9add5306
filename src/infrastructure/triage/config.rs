use std::time::Duration;

use serde::Deserialize;

use super::stages::DEFAULT_SIMILAR_INCIDENTS;
use crate::domain::triage::{RetryPolicy, DEFAULT_MAX_PLAN_TASKS, MIN_PLAN_TASKS};
use crate::domain::CompletionParams;

/// Sampling parameters for each LLM-backed stage
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StageParams {
    pub planning: CompletionParams,
    pub task_execution: CompletionParams,
    pub reflection: CompletionParams,
    pub recommendation: CompletionParams,
}

impl Default for StageParams {
    fn default() -> Self {
        Self {
            planning: CompletionParams::new(0.2, 1024),
            task_execution: CompletionParams::new(0.3, 1024),
            reflection: CompletionParams::new(0.2, 512),
            recommendation: CompletionParams::new(0.2, 2048),
        }
    }
}

/// Configuration for the workflow engine
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Cap on plan length, including the knowledge lookup task
    pub max_plan_tasks: usize,

    /// Hard step ceiling; derived from the plan cap when unset
    pub max_steps: Option<u32>,

    /// Incidents requested from similarity search
    pub similar_incidents: usize,

    /// Timeout applied to every external call
    pub call_timeout_ms: u64,

    pub retry: RetryPolicy,

    pub stages: StageParams,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_plan_tasks: DEFAULT_MAX_PLAN_TASKS,
            max_steps: None,
            similar_incidents: DEFAULT_SIMILAR_INCIDENTS,
            call_timeout_ms: 60_000,
            retry: RetryPolicy::default(),
            stages: StageParams::default(),
        }
    }
}

impl WorkflowConfig {
    /// Effective plan cap, never below the minimum plan length
    pub fn plan_cap(&self) -> usize {
        self.max_plan_tasks.max(MIN_PLAN_TASKS)
    }

    /// Effective step ceiling: a full plan needs two steps per task plus
    /// planning and recommendation.
    pub fn step_ceiling(&self) -> u32 {
        self.max_steps
            .unwrap_or_else(|| 2 * self.plan_cap() as u32 + 2)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms.max(1))
    }
}
