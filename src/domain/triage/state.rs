//! Workflow state
//!
//! One `WorkflowState` exists per alert per run and is exclusively owned by
//! that run's engine. It changes only through [`WorkflowState::apply`], which
//! validates a stage output against the current state before merging it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::alert::Alert;
use super::error::StageFailure;
use super::plan::{Plan, KNOWLEDGE_LOOKUP_TASK};
use super::recommendation::Recommendation;
use super::stage::StageOutput;
use crate::domain::incident::Incident;
use crate::domain::infra::InfraContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    alert: Alert,
    infra_context: InfraContext,
    plan: Option<Plan>,
    completed_task_indices: Vec<usize>,
    similar_incidents: Vec<Incident>,
    task_results: BTreeMap<usize, String>,
    reflections: Vec<String>,
    recommendation: Option<Recommendation>,
    step_count: u32,
}

impl WorkflowState {
    /// Fresh state: no plan, empty collections
    pub fn new(alert: Alert, infra_context: InfraContext) -> Self {
        Self {
            alert,
            infra_context,
            plan: None,
            completed_task_indices: Vec::new(),
            similar_incidents: Vec::new(),
            task_results: BTreeMap::new(),
            reflections: Vec::new(),
            recommendation: None,
            step_count: 0,
        }
    }

    pub fn alert(&self) -> &Alert {
        &self.alert
    }

    pub fn infra_context(&self) -> &InfraContext {
        &self.infra_context
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn completed_task_indices(&self) -> &[usize] {
        &self.completed_task_indices
    }

    pub fn similar_incidents(&self) -> &[Incident] {
        &self.similar_incidents
    }

    pub fn task_results(&self) -> &BTreeMap<usize, String> {
        &self.task_results
    }

    pub fn task_result(&self, index: usize) -> Option<&str> {
        self.task_results.get(&index).map(String::as_str)
    }

    pub fn reflections(&self) -> &[String] {
        &self.reflections
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.recommendation.as_ref()
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn is_terminal(&self) -> bool {
        self.recommendation.is_some()
    }

    /// Index of the next task to run
    pub fn next_task_index(&self) -> usize {
        self.completed_task_indices.len()
    }

    pub fn latest_completed_index(&self) -> Option<usize> {
        self.completed_task_indices.last().copied()
    }

    /// The latest completed task has not been reflected upon yet
    pub fn needs_reflection(&self) -> bool {
        self.reflections.len() < self.completed_task_indices.len()
    }

    pub fn all_tasks_completed(&self) -> bool {
        self.plan
            .as_ref()
            .is_some_and(|plan| self.completed_task_indices.len() >= plan.len())
    }

    /// Plan entries that have been run, in order
    pub fn completed_tasks(&self) -> Vec<String> {
        let Some(plan) = &self.plan else {
            return Vec::new();
        };

        self.completed_task_indices
            .iter()
            .filter_map(|&i| plan.get(i).map(str::to_string))
            .collect()
    }

    pub(crate) fn increment_step(&mut self) {
        self.step_count += 1;
    }

    /// Merge a stage output into the state.
    ///
    /// The output is validated first; on error the state is left untouched.
    pub fn apply(&mut self, output: StageOutput) -> Result<(), StageFailure> {
        match output {
            StageOutput::Plan(plan) => {
                if self.plan.is_some() {
                    return Err(StageFailure::invariant("plan already set"));
                }

                if plan.get(0) != Some(KNOWLEDGE_LOOKUP_TASK) {
                    return Err(StageFailure::invariant(
                        "plan must start with the knowledge lookup task",
                    ));
                }

                if !plan.has_investigation_tasks() {
                    return Err(StageFailure::invariant(
                        "plan has no investigation tasks beyond knowledge lookup",
                    ));
                }

                self.plan = Some(plan);
            }

            StageOutput::KnowledgeLookup { incidents, finding } => {
                if self.plan.is_none() {
                    return Err(StageFailure::invariant("knowledge lookup before planning"));
                }

                if !self.completed_task_indices.is_empty() {
                    return Err(StageFailure::invariant("knowledge lookup already completed"));
                }

                self.similar_incidents = incidents;
                self.record_task(0, finding);
            }

            StageOutput::Finding {
                task_index,
                finding,
            } => {
                let plan_len = self.plan.as_ref().map(Plan::len).unwrap_or(0);

                if self.needs_reflection() {
                    return Err(StageFailure::invariant(format!(
                        "task {} executed before task {} was reflected upon",
                        task_index,
                        self.latest_completed_index().unwrap_or_default()
                    )));
                }

                if task_index == 0
                    || task_index != self.next_task_index()
                    || task_index >= plan_len
                {
                    return Err(StageFailure::invariant(format!(
                        "finding for task {} but next task is {} of {}",
                        task_index,
                        self.next_task_index(),
                        plan_len
                    )));
                }

                self.record_task(task_index, finding);
            }

            StageOutput::Reflection {
                task_index,
                reflection,
            } => {
                if !self.needs_reflection() || self.latest_completed_index() != Some(task_index) {
                    return Err(StageFailure::invariant(format!(
                        "reflection for task {} does not match the latest unreflected task",
                        task_index
                    )));
                }

                self.reflections.push(reflection);
            }

            StageOutput::Recommendation(recommendation) => {
                if self.recommendation.is_some() {
                    return Err(StageFailure::invariant("recommendation already set"));
                }

                if !self.all_tasks_completed() || self.needs_reflection() {
                    return Err(StageFailure::invariant(
                        "recommendation before every task was completed and reflected upon",
                    ));
                }

                if recommendation.alert_id != self.alert.id {
                    return Err(StageFailure::invariant(format!(
                        "recommendation for alert '{}' in run for '{}'",
                        recommendation.alert_id, self.alert.id
                    )));
                }

                let known: HashSet<&str> =
                    self.similar_incidents.iter().map(|i| i.id.as_str()).collect();

                if let Some(unknown) = recommendation
                    .similar_incidents
                    .iter()
                    .find(|i| !known.contains(i.id.as_str()))
                {
                    return Err(StageFailure::invalid_output(format!(
                        "recommendation references unknown incident '{}'",
                        unknown.id
                    )));
                }

                self.recommendation = Some(recommendation);
            }
        }

        Ok(())
    }

    fn record_task(&mut self, index: usize, finding: String) {
        self.completed_task_indices.push(index);
        self.task_results.insert(index, finding);
    }

    /// Check the structural invariants that hold at every step boundary
    pub fn check_invariants(&self) -> Result<(), String> {
        let completed = self.completed_task_indices.len();

        if self
            .completed_task_indices
            .iter()
            .enumerate()
            .any(|(position, &index)| position != index)
        {
            return Err("completed task indices are not a contiguous prefix".to_string());
        }

        if self.task_results.len() != completed
            || self.task_results.keys().ne(self.completed_task_indices.iter())
        {
            return Err("task results do not match completed tasks".to_string());
        }

        if self.reflections.len() > completed || self.reflections.len() + 1 < completed {
            return Err(format!(
                "{} reflections for {} completed tasks",
                self.reflections.len(),
                completed
            ));
        }

        match &self.plan {
            None if completed > 0 => {
                return Err("tasks completed without a plan".to_string());
            }
            Some(plan) if completed > plan.len() => {
                return Err("more tasks completed than planned".to_string());
            }
            _ => {}
        }

        if self.recommendation.is_some() && (!self.all_tasks_completed() || self.needs_reflection())
        {
            return Err("recommendation present before the plan was finished".to_string());
        }

        Ok(())
    }
}
