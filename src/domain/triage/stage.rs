//! Stage contracts
//!
//! A stage reads an immutable snapshot of the workflow state and returns a
//! typed output; only the engine merges outputs into the state. Retrying a
//! stage therefore can never duplicate recorded progress.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::error::StageFailure;
use super::plan::Plan;
use super::recommendation::Recommendation;
use super::state::WorkflowState;
use crate::domain::incident::Incident;
use crate::domain::DomainError;

/// The five workflow stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Planning,
    KnowledgeLookup,
    TaskExecution,
    Reflection,
    Recommendation,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::KnowledgeLookup => "knowledge_lookup",
            Self::TaskExecution => "task_execution",
            Self::Reflection => "reflection",
            Self::Recommendation => "recommendation",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage produced
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Plan(Plan),
    KnowledgeLookup {
        incidents: Vec<Incident>,
        /// Finding recorded for task 0
        finding: String,
    },
    Finding {
        task_index: usize,
        finding: String,
    },
    Reflection {
        task_index: usize,
        reflection: String,
    },
    Recommendation(Recommendation),
}

impl StageOutput {
    /// Stage kind that is allowed to produce this output
    pub fn stage(&self) -> StageKind {
        match self {
            Self::Plan(_) => StageKind::Planning,
            Self::KnowledgeLookup { .. } => StageKind::KnowledgeLookup,
            Self::Finding { .. } => StageKind::TaskExecution,
            Self::Reflection { .. } => StageKind::Reflection,
            Self::Recommendation(_) => StageKind::Recommendation,
        }
    }
}

/// Per-run context handed to every stage invocation
#[derive(Debug, Clone)]
pub struct StageContext {
    cancel: CancellationToken,
    call_timeout: Duration,
}

impl StageContext {
    pub fn new(cancel: CancellationToken, call_timeout: Duration) -> Self {
        Self {
            cancel,
            call_timeout,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Run one external call under the per-call timeout, racing cancellation.
    ///
    /// A timeout is reported as a transient failure.
    pub async fn call<T, F>(&self, operation: &str, call: F) -> Result<T, StageFailure>
    where
        F: Future<Output = Result<T, DomainError>> + Send,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StageFailure::Cancelled),
            result = tokio::time::timeout(self.call_timeout, call) => match result {
                Ok(inner) => inner.map_err(StageFailure::from),
                Err(_) => Err(StageFailure::from(DomainError::timeout(
                    operation,
                    self.call_timeout.as_millis() as u64,
                ))),
            },
        }
    }
}

/// A single transformation step of the workflow
#[async_trait]
pub trait Stage: Send + Sync + fmt::Debug {
    fn kind(&self) -> StageKind;

    /// Compute this stage's output from the current state
    async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StageOutput, StageFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(timeout_ms: u64) -> StageContext {
        StageContext::new(CancellationToken::new(), Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn test_call_passes_through_success() {
        let result = ctx(1000)
            .call("complete", async { Ok::<_, DomainError>(42) })
            .await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_call_classifies_errors() {
        let result: Result<(), _> = ctx(1000)
            .call("complete", async {
                Err(DomainError::completion_transient("openai", "503"))
            })
            .await;
        assert!(matches!(result, Err(StageFailure::Transient(_))));

        let result: Result<(), _> = ctx(1000)
            .call("search", async { Err(DomainError::search("bad collection")) })
            .await;
        assert!(matches!(result, Err(StageFailure::Collaborator(_))));
    }

    #[tokio::test]
    async fn test_call_timeout_is_transient() {
        let result: Result<(), _> = ctx(10)
            .call("complete", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(StageFailure::Transient(message)) => assert!(message.contains("complete")),
            other => panic!("expected transient timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = StageContext::new(token.clone(), Duration::from_secs(30));

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result: Result<(), _> = ctx
            .call("complete", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        canceller.await.unwrap();
        assert_eq!(result, Err(StageFailure::Cancelled));
    }

    #[test]
    fn test_stage_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&StageKind::KnowledgeLookup).unwrap(),
            "\"knowledge_lookup\""
        );
        assert_eq!(StageKind::TaskExecution.to_string(), "task_execution");
    }
}
