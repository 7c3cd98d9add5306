//! Alert service - resolves infrastructure context and runs the triage workflow

use std::sync::Arc;

use serde_json::Map;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::triage::{
    retry_with_backoff, Alert, Recommendation, RetryFailure, StageContext, StageFailure,
    WorkflowError, WorkflowState,
};
use crate::domain::{ContextResolver, DomainError, InfraContext};
use crate::infrastructure::triage::{WorkflowEngine, WorkflowRun};

#[derive(Debug, Clone, Error)]
pub enum AlertServiceError {
    #[error("Invalid alert: {0}")]
    InvalidAlert(DomainError),

    #[error("Failed to resolve infrastructure context after {attempts} attempt(s): {cause}")]
    Context { cause: StageFailure, attempts: u32 },

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Entry point for processing alerts
pub struct AlertService {
    resolver: Arc<dyn ContextResolver>,
    engine: Arc<WorkflowEngine>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for AlertService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl AlertService {
    pub fn new(resolver: Arc<dyn ContextResolver>, engine: Arc<WorkflowEngine>) -> Self {
        Self {
            resolver,
            engine,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel in-flight runs when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Process an alert into a recommendation
    pub async fn process(&self, alert: Alert) -> Result<Recommendation, AlertServiceError> {
        self.process_detailed(alert)
            .await
            .map(|run| run.recommendation)
    }

    /// Process an alert and keep the step trace
    pub async fn process_detailed(&self, alert: Alert) -> Result<WorkflowRun, AlertServiceError> {
        alert.validate().map_err(AlertServiceError::InvalidAlert)?;

        let cancel = self.shutdown.child_token();
        let infra_context = self.resolve_context(&alert, &cancel).await?;

        info!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            context_keys = infra_context.len(),
            "Processing alert"
        );

        self.engine
            .run_detailed(alert, infra_context, cancel)
            .await
            .map_err(|e| {
                warn!(error = %e, "Alert processing failed");
                AlertServiceError::Workflow(e)
            })
    }

    /// Resolve context under the workflow's call timeout and retry policy,
    /// observing cancellation
    async fn resolve_context(
        &self,
        alert: &Alert,
        cancel: &CancellationToken,
    ) -> Result<InfraContext, AlertServiceError> {
        let config = self.engine.config();
        let ctx = StageContext::new(cancel.clone(), config.call_timeout());

        let result = retry_with_backoff(&config.retry, cancel, |_| {
            ctx.call("resolve_context", self.resolver.resolve_context(alert))
        })
        .await;

        match result {
            Ok((context, _)) => Ok(context),
            Err(RetryFailure {
                failure: StageFailure::Cancelled,
                ..
            }) => {
                warn!(alert_id = %alert.id, "Cancelled while resolving context");
                let snapshot = WorkflowState::new(alert.clone(), Map::new());
                Err(WorkflowError::cancelled(None, &snapshot).into())
            }
            Err(RetryFailure { failure, attempts }) => {
                warn!(
                    alert_id = %alert.id,
                    attempts,
                    error = %failure,
                    "Context resolution failed"
                );
                Err(AlertServiceError::Context {
                    cause: failure,
                    attempts,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::incident::MockSimilaritySearch;
    use crate::domain::infra::MockContextResolver;
    use crate::domain::triage::{RetryPolicy, StageKind};
    use crate::domain::Incident;
    use crate::infrastructure::triage::stages::testing::ScriptedCompletion;
    use crate::infrastructure::triage::WorkflowConfig;
    use mockall::predicate::{always, eq};
    use serde_json::{json, Map};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn engine(search: MockSimilaritySearch) -> Arc<WorkflowEngine> {
        engine_with_timeout(search, 60_000)
    }

    fn engine_with_timeout(
        search: MockSimilaritySearch,
        call_timeout_ms: u64,
    ) -> Arc<WorkflowEngine> {
        Arc::new(WorkflowEngine::new(
            Arc::new(ScriptedCompletion::new(
                "1. Inspect pod logs\n2. Review memory limits",
                "Raise the limit as in [incident:INC-1].",
            )),
            Arc::new(search),
            WorkflowConfig {
                retry: RetryPolicy::new(2).with_initial_delay(1),
                call_timeout_ms,
                ..Default::default()
            },
        ))
    }

    /// Never answers
    struct HangingResolver;

    #[async_trait::async_trait]
    impl ContextResolver for HangingResolver {
        async fn resolve_context(&self, _alert: &Alert) -> Result<InfraContext, DomainError> {
            std::future::pending().await
        }
    }

    /// Times out once, then resolves
    #[derive(Default)]
    struct FlakyResolver {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl ContextResolver for FlakyResolver {
        async fn resolve_context(&self, _alert: &Alert) -> Result<InfraContext, DomainError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DomainError::timeout("graph_lookup", 10));
            }
            Ok(Map::new())
        }
    }

    fn alert() -> Alert {
        Alert::new("a1", "PodCrashLoop", "Pod api in prod", "OOMKilled")
    }

    #[tokio::test]
    async fn test_process_alert() {
        let mut resolver = MockContextResolver::new();
        resolver.expect_resolve_context().times(1).returning(|_| {
            let mut context = Map::new();
            context.insert("cluster".to_string(), json!("prod"));
            Ok(context)
        });

        let mut search = MockSimilaritySearch::new();
        search
            .expect_search()
            .with(always(), eq(3))
            .times(1)
            .returning(|_, _| Ok(vec![Incident::new("INC-1", "OOMKilled", "Raise limit", 0.8)]));

        let service = AlertService::new(Arc::new(resolver), engine(search));
        let run = service.process_detailed(alert()).await.unwrap();

        assert_eq!(run.recommendation.similar_incidents[0].id, "INC-1");
        assert_eq!(run.state.infra_context()["cluster"], "prod");
    }

    #[tokio::test]
    async fn test_invalid_alert_rejected_before_resolution() {
        let mut resolver = MockContextResolver::new();
        resolver.expect_resolve_context().never();

        let service = AlertService::new(Arc::new(resolver), engine(MockSimilaritySearch::new()));
        let err = service
            .process(Alert::new("", "PodCrashLoop", "s", "d"))
            .await
            .unwrap_err();

        assert!(matches!(err, AlertServiceError::InvalidAlert(_)));
    }

    #[tokio::test]
    async fn test_context_failure() {
        let mut resolver = MockContextResolver::new();
        resolver
            .expect_resolve_context()
            .returning(|_| Err(DomainError::context("graph unavailable")));

        let service = AlertService::new(Arc::new(resolver), engine(MockSimilaritySearch::new()));
        let err = service.process(alert()).await.unwrap_err();

        match err {
            AlertServiceError::Context { cause, attempts } => {
                assert!(matches!(cause, StageFailure::Collaborator(_)));
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hanging_resolver_times_out() {
        let service = AlertService::new(
            Arc::new(HangingResolver),
            engine_with_timeout(MockSimilaritySearch::new(), 50),
        );

        let err = tokio::time::timeout(Duration::from_secs(2), service.process(alert()))
            .await
            .expect("context resolution must respect the call timeout")
            .unwrap_err();

        match err {
            AlertServiceError::Context { cause, attempts } => {
                assert!(
                    matches!(cause, StageFailure::Transient(ref m) if m.contains("resolve_context"))
                );
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_context_resolution() {
        let shutdown = CancellationToken::new();
        let service = AlertService::new(
            Arc::new(HangingResolver),
            engine(MockSimilaritySearch::new()),
        )
        .with_shutdown(shutdown.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            shutdown.cancel();
        });

        let err = tokio::time::timeout(Duration::from_secs(2), service.process(alert()))
            .await
            .expect("shutdown must interrupt context resolution")
            .unwrap_err();
        canceller.await.unwrap();

        match err {
            AlertServiceError::Workflow(workflow) => {
                assert!(workflow.is_cancelled());
                assert_eq!(workflow.failed_stage(), None);
                assert!(workflow.snapshot().plan().is_none());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transient_context_failure_retried() {
        let mut search = MockSimilaritySearch::new();
        search
            .expect_search()
            .returning(|_, _| Ok(vec![Incident::new("INC-1", "OOMKilled", "Raise limit", 0.8)]));

        let resolver = Arc::new(FlakyResolver::default());
        let service = AlertService::new(resolver.clone(), engine(search));

        let recommendation = service.process(alert()).await.unwrap();

        assert_eq!(recommendation.alert_id, "a1");
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_search_failure_surfaces_as_workflow_error() {
        let mut resolver = MockContextResolver::new();
        resolver
            .expect_resolve_context()
            .returning(|_| Ok(Map::new()));

        let mut search = MockSimilaritySearch::new();
        search
            .expect_search()
            .times(2)
            .returning(|_, _| Err(DomainError::search_transient("connection reset")));

        let service = AlertService::new(Arc::new(resolver), engine(search));
        let err = service.process(alert()).await.unwrap_err();

        match err {
            AlertServiceError::Workflow(workflow) => {
                assert_eq!(workflow.failed_stage(), Some(StageKind::KnowledgeLookup));
                assert!(workflow.snapshot().plan().is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_cancels_runs() {
        let mut resolver = MockContextResolver::new();
        resolver
            .expect_resolve_context()
            .returning(|_| Ok(Map::new()));

        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let service = AlertService::new(Arc::new(resolver), engine(MockSimilaritySearch::new()))
            .with_shutdown(shutdown);
        let err = service.process(alert()).await.unwrap_err();

        assert!(matches!(err, AlertServiceError::Workflow(ref e) if e.is_cancelled()));
    }
}
