//! Workflow engine
//!
//! Drives one alert through planning, knowledge lookup, task execution,
//! reflection and recommendation. Each step asks the router for the next
//! stage, runs it under the retry policy and merges the output into the
//! run's exclusively-owned state.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::config::WorkflowConfig;
use super::stages::{
    KnowledgeLookupStage, PlanningStage, RecommendationStage, ReflectionStage, StageSet,
    TaskExecutionStage,
};
use crate::domain::triage::{
    retry_with_backoff, route, Alert, Recommendation, RetryFailure, StageContext, StageFailure,
    StageKind, WorkflowError, WorkflowState,
};
use crate::domain::{CompletionClient, InfraContext, SimilaritySearch};

/// One executed step of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// 1-based step number
    pub step: u32,
    pub stage: StageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_index: Option<usize>,
    /// Attempts spent, including retries
    pub attempts: u32,
    pub execution_time_ms: u64,
}

/// Result of a successful run with its step trace
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    pub run_id: Uuid,
    pub recommendation: Recommendation,
    pub steps: Vec<StepRecord>,
    pub execution_time_ms: u64,
    /// Final state, for replay and diagnostics
    pub state: WorkflowState,
}

pub struct WorkflowEngine {
    stages: StageSet,
    config: WorkflowConfig,
}

impl fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkflowEngine {
    /// Build an engine with the standard stages over the given collaborators
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        search: Arc<dyn SimilaritySearch>,
        config: WorkflowConfig,
    ) -> Self {
        let params = &config.stages;
        let stages = StageSet {
            planning: Arc::new(PlanningStage::new(
                completion.clone(),
                params.planning,
                config.plan_cap(),
            )),
            knowledge_lookup: Arc::new(KnowledgeLookupStage::new(
                search,
                config.similar_incidents,
            )),
            task_execution: Arc::new(TaskExecutionStage::new(
                completion.clone(),
                params.task_execution,
            )),
            reflection: Arc::new(ReflectionStage::new(completion.clone(), params.reflection)),
            recommendation: Arc::new(RecommendationStage::new(completion, params.recommendation)),
        };

        Self::with_stages(stages, config)
    }

    /// Build an engine over custom stage implementations
    pub fn with_stages(stages: StageSet, config: WorkflowConfig) -> Self {
        Self { stages, config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the workflow to a recommendation
    pub async fn run(
        &self,
        alert: Alert,
        infra_context: InfraContext,
    ) -> Result<Recommendation, WorkflowError> {
        self.run_with_cancellation(alert, infra_context, CancellationToken::new())
            .await
    }

    /// Run the workflow, aborting with `WorkflowError::Cancelled` once `cancel` fires
    pub async fn run_with_cancellation(
        &self,
        alert: Alert,
        infra_context: InfraContext,
        cancel: CancellationToken,
    ) -> Result<Recommendation, WorkflowError> {
        self.run_detailed(alert, infra_context, cancel)
            .await
            .map(|run| run.recommendation)
    }

    /// Run the workflow and report every executed step
    pub async fn run_detailed(
        &self,
        alert: Alert,
        infra_context: InfraContext,
        cancel: CancellationToken,
    ) -> Result<WorkflowRun, WorkflowError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "workflow",
            %run_id,
            alert_id = %alert.id,
            alert_type = %alert.alert_type
        );

        self.drive(run_id, WorkflowState::new(alert, infra_context), cancel)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        run_id: Uuid,
        mut state: WorkflowState,
        cancel: CancellationToken,
    ) -> Result<WorkflowRun, WorkflowError> {
        let start = Instant::now();
        let max_steps = self.config.step_ceiling();
        let ctx = StageContext::new(cancel.clone(), self.config.call_timeout());
        let mut steps = Vec::new();

        info!(max_steps, "Workflow started");

        loop {
            let next = route(&state);
            let Some(kind) = next.stage() else {
                break;
            };

            if cancel.is_cancelled() {
                warn!(stage = %kind, step = state.step_count(), "Workflow cancelled");
                return Err(WorkflowError::cancelled(Some(kind), &state));
            }

            if state.step_count() >= max_steps {
                warn!(stage = %kind, max_steps, "Workflow exhausted its step budget");
                return Err(WorkflowError::exhausted(max_steps, &state));
            }

            let stage = self.stages.get(kind);
            let step_start = Instant::now();

            debug!(
                stage = %kind,
                task_index = ?next.task_index(),
                step = state.step_count() + 1,
                "Executing stage"
            );

            let result = retry_with_backoff(&self.config.retry, &cancel, |attempt| {
                debug!(stage = %kind, attempt, "Stage attempt");
                stage.execute(&state, &ctx)
            })
            .await;

            let (output, attempts) = match result {
                Ok(done) => done,
                Err(RetryFailure {
                    failure: StageFailure::Cancelled,
                    ..
                }) => {
                    warn!(stage = %kind, step = state.step_count(), "Workflow cancelled");
                    return Err(WorkflowError::cancelled(Some(kind), &state));
                }
                Err(RetryFailure { failure, attempts }) => {
                    warn!(stage = %kind, attempts, error = %failure, "Stage failed");
                    return Err(WorkflowError::stage(kind, failure, attempts, &state));
                }
            };

            if output.stage() != kind {
                let failure = StageFailure::invariant(format!(
                    "stage '{}' produced output for '{}'",
                    kind,
                    output.stage()
                ));
                return Err(WorkflowError::stage(kind, failure, attempts, &state));
            }

            if let Err(failure) = state.apply(output) {
                warn!(stage = %kind, error = %failure, "Stage output rejected");
                return Err(WorkflowError::stage(kind, failure, attempts, &state));
            }

            state.increment_step();
            debug_assert!(state.check_invariants().is_ok());

            steps.push(StepRecord {
                step: state.step_count(),
                stage: kind,
                task_index: next.task_index(),
                attempts,
                execution_time_ms: step_start.elapsed().as_millis() as u64,
            });
        }

        let Some(recommendation) = state.recommendation().cloned() else {
            let failure = StageFailure::invariant("workflow finished without a recommendation");
            return Err(WorkflowError::stage(
                StageKind::Recommendation,
                failure,
                0,
                &state,
            ));
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        info!(
            steps = state.step_count(),
            similar_incidents = recommendation.similar_incidents.len(),
            execution_time_ms,
            "Workflow completed"
        );

        Ok(WorkflowRun {
            run_id,
            recommendation,
            steps,
            execution_time_ms,
            state,
        })
    }
}
