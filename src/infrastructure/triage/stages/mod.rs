//! Stage implementations backed by the completion and search collaborators

mod knowledge_lookup;
mod planning;
mod reflection;
mod recommendation;
mod task_execution;

use std::sync::Arc;

pub use knowledge_lookup::{KnowledgeLookupStage, DEFAULT_SIMILAR_INCIDENTS};
pub use planning::{parse_plan_lines, PlanningStage};
pub use recommendation::{cited_incident_ids, RecommendationStage};
pub use reflection::ReflectionStage;
pub use task_execution::TaskExecutionStage;

use crate::domain::triage::{Stage, StageContext, StageFailure, StageKind};
use crate::domain::{CompletionClient, CompletionParams};

/// One implementation per stage kind
#[derive(Debug, Clone)]
pub struct StageSet {
    pub planning: Arc<dyn Stage>,
    pub knowledge_lookup: Arc<dyn Stage>,
    pub task_execution: Arc<dyn Stage>,
    pub reflection: Arc<dyn Stage>,
    pub recommendation: Arc<dyn Stage>,
}

impl StageSet {
    pub fn get(&self, kind: StageKind) -> &dyn Stage {
        match kind {
            StageKind::Planning => self.planning.as_ref(),
            StageKind::KnowledgeLookup => self.knowledge_lookup.as_ref(),
            StageKind::TaskExecution => self.task_execution.as_ref(),
            StageKind::Reflection => self.reflection.as_ref(),
            StageKind::Recommendation => self.recommendation.as_ref(),
        }
    }
}

/// Ask the completion collaborator and reject blank output
async fn complete_non_blank(
    completion: &dyn CompletionClient,
    ctx: &StageContext,
    prompt: &str,
    params: CompletionParams,
    what: &str,
) -> Result<String, StageFailure> {
    let text = ctx
        .call("complete", completion.complete(prompt, params))
        .await?;

    let text = text.trim();
    if text.is_empty() {
        return Err(StageFailure::invalid_output(format!("{} is blank", what)));
    }

    Ok(text.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic collaborator stubs shared by stage and engine tests

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::{
        CompletionClient, CompletionParams, DomainError, Incident, SimilaritySearch,
    };

    /// Routes prompts to canned answers by their heading
    #[derive(Debug)]
    pub struct ScriptedCompletion {
        pub plan: String,
        pub recommendation: String,
        transient_failures: Mutex<VecDeque<&'static str>>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<(String, CompletionParams)>>,
    }

    impl ScriptedCompletion {
        pub fn new(plan: &str, recommendation: &str) -> Self {
            Self {
                plan: plan.to_string(),
                recommendation: recommendation.to_string(),
                transient_failures: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Fail the next calls whose prompt belongs to `stage` with a transient error
        pub fn fail_transiently(self, stage: &'static str, times: usize) -> Self {
            {
                let mut failures = self.transient_failures.lock().unwrap();
                for _ in 0..times {
                    failures.push_back(stage);
                }
            }
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<(String, CompletionParams)> {
            self.prompts.lock().unwrap().clone()
        }

        fn stage_of(prompt: &str) -> &'static str {
            if prompt.contains("creating an investigation plan") {
                "planning"
            } else if prompt.contains("critical reflection") {
                "reflection"
            } else if prompt.contains("solution recommendations") {
                "recommendation"
            } else {
                "task_execution"
            }
        }

        fn current_task(prompt: &str) -> &str {
            prompt
                .split("## CURRENT TASK\n")
                .nth(1)
                .and_then(|rest| rest.lines().next())
                .unwrap_or("unknown")
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(
            &self,
            prompt: &str,
            params: CompletionParams,
        ) -> Result<String, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), params));

            let stage = Self::stage_of(prompt);
            {
                let mut failures = self.transient_failures.lock().unwrap();
                if failures.front() == Some(&stage) {
                    failures.pop_front();
                    return Err(DomainError::completion_transient("scripted", "HTTP 503"));
                }
            }

            Ok(match stage {
                "planning" => self.plan.clone(),
                "recommendation" => self.recommendation.clone(),
                "reflection" => format!("Reflected on: {}", Self::current_task(prompt)),
                _ => format!("Findings for: {}", Self::current_task(prompt)),
            })
        }
    }

    /// Returns a fixed incident list and counts searches
    #[derive(Debug, Default)]
    pub struct FixedSearch {
        pub incidents: Vec<Incident>,
        pub queries: Mutex<Vec<(String, usize)>>,
    }

    impl FixedSearch {
        pub fn new(incidents: Vec<Incident>) -> Self {
            Self {
                incidents,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SimilaritySearch for FixedSearch {
        async fn search(&self, query: &str, k: usize) -> Result<Vec<Incident>, DomainError> {
            self.queries.lock().unwrap().push((query.to_string(), k));
            Ok(self.incidents.clone())
        }
    }
}
