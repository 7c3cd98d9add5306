//! Routing: which stage runs next
//!
//! A total function over the state. Every reachable state maps to exactly one
//! route, so the engine never needs a fallback edge.

use super::stage::StageKind;
use super::state::WorkflowState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Planning,
    KnowledgeLookup,
    Reflection { task_index: usize },
    TaskExecution { task_index: usize },
    Recommendation,
    Done,
}

impl Route {
    /// Stage to invoke, `None` once the run is finished
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Self::Planning => Some(StageKind::Planning),
            Self::KnowledgeLookup => Some(StageKind::KnowledgeLookup),
            Self::Reflection { .. } => Some(StageKind::Reflection),
            Self::TaskExecution { .. } => Some(StageKind::TaskExecution),
            Self::Recommendation => Some(StageKind::Recommendation),
            Self::Done => None,
        }
    }

    pub fn task_index(&self) -> Option<usize> {
        match self {
            Self::KnowledgeLookup => Some(0),
            Self::Reflection { task_index } | Self::TaskExecution { task_index } => {
                Some(*task_index)
            }
            _ => None,
        }
    }
}

/// Decide the next route. Rules are evaluated in order.
pub fn route(state: &WorkflowState) -> Route {
    if state.is_terminal() {
        return Route::Done;
    }

    let Some(plan) = state.plan() else {
        return Route::Planning;
    };

    let completed = state.completed_task_indices().len();
    if completed == 0 {
        return Route::KnowledgeLookup;
    }

    if state.needs_reflection() {
        if let Some(task_index) = state.latest_completed_index() {
            return Route::Reflection { task_index };
        }
    }

    if completed < plan.len() {
        return Route::TaskExecution {
            task_index: completed,
        };
    }

    Route::Recommendation
}
