//! Alert triage workflow domain: state, stage contracts, routing and retry

mod alert;
mod error;
mod plan;
mod recommendation;
mod retry;
mod router;
mod stage;
mod state;

pub use alert::Alert;
pub use error::{StageFailure, WorkflowError};
pub use plan::{
    is_knowledge_lookup_task, Plan, DEFAULT_MAX_PLAN_TASKS, KNOWLEDGE_LOOKUP_TASK, MIN_PLAN_TASKS,
};
pub use recommendation::Recommendation;
pub use retry::{retry_with_backoff, RetryFailure, RetryPolicy};
pub use router::{route, Route};
pub use stage::{Stage, StageContext, StageKind, StageOutput};
pub use state::WorkflowState;
