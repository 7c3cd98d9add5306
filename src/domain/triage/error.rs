//! Workflow error types

use thiserror::Error;

use super::stage::StageKind;
use super::state::WorkflowState;
use crate::domain::DomainError;

/// Why a single stage invocation failed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageFailure {
    #[error("Transient collaborator error: {0}")]
    Transient(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("State invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Cancelled")]
    Cancelled,
}

impl StageFailure {
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Only transient collaborator failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<DomainError> for StageFailure {
    fn from(error: DomainError) -> Self {
        if error.is_transient() {
            Self::Transient(error.to_string())
        } else {
            Self::Collaborator(error.to_string())
        }
    }
}

/// Errors surfaced to callers of a workflow run.
///
/// Every variant carries the last state that passed invariant checks, for
/// diagnostics and replay.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error("Stage '{stage}' failed after {attempts} attempt(s): {cause}")]
    Stage {
        stage: StageKind,
        cause: StageFailure,
        attempts: u32,
        snapshot: Box<WorkflowState>,
    },

    #[error("Workflow exceeded the step ceiling of {max_steps}")]
    Exhausted {
        max_steps: u32,
        snapshot: Box<WorkflowState>,
    },

    #[error("Workflow cancelled")]
    Cancelled {
        stage: Option<StageKind>,
        snapshot: Box<WorkflowState>,
    },
}

impl WorkflowError {
    pub fn stage(
        stage: StageKind,
        cause: StageFailure,
        attempts: u32,
        snapshot: &WorkflowState,
    ) -> Self {
        Self::Stage {
            stage,
            cause,
            attempts,
            snapshot: Box::new(snapshot.clone()),
        }
    }

    pub fn exhausted(max_steps: u32, snapshot: &WorkflowState) -> Self {
        Self::Exhausted {
            max_steps,
            snapshot: Box::new(snapshot.clone()),
        }
    }

    pub fn cancelled(stage: Option<StageKind>, snapshot: &WorkflowState) -> Self {
        Self::Cancelled {
            stage,
            snapshot: Box::new(snapshot.clone()),
        }
    }

    /// Last valid state before the failure
    pub fn snapshot(&self) -> &WorkflowState {
        match self {
            Self::Stage { snapshot, .. }
            | Self::Exhausted { snapshot, .. }
            | Self::Cancelled { snapshot, .. } => snapshot,
        }
    }

    /// Stage that was running (or about to run) when the workflow failed
    pub fn failed_stage(&self) -> Option<StageKind> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Cancelled { stage, .. } => *stage,
            Self::Exhausted { .. } => None,
        }
    }

    pub fn cause(&self) -> Option<&StageFailure> {
        match self {
            Self::Stage { cause, .. } => Some(cause),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_invalid_plan(&self) -> bool {
        matches!(self.cause(), Some(StageFailure::InvalidPlan(_)))
    }
}
