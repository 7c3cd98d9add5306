use serde::{Deserialize, Serialize};

/// The fixed first task of every plan
pub const KNOWLEDGE_LOOKUP_TASK: &str = "Check similar past incidents";

/// Default cap on plan length, including the knowledge lookup task
pub const DEFAULT_MAX_PLAN_TASKS: usize = 5;

/// Shortest accepted plan: the lookup task plus two investigation tasks
pub const MIN_PLAN_TASKS: usize = 3;

/// Ordered investigation tasks. Built once by planning and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    tasks: Vec<String>,
}

impl Plan {
    /// Build a plan from generated tasks.
    ///
    /// The knowledge lookup task is always placed first; generated entries
    /// restating it are dropped. The result is truncated to `max_tasks`
    /// (never below [`MIN_PLAN_TASKS`]).
    pub fn with_knowledge_lookup(generated: Vec<String>, max_tasks: usize) -> Self {
        let max_tasks = max_tasks.max(MIN_PLAN_TASKS);
        let mut tasks = Vec::with_capacity(max_tasks);
        tasks.push(KNOWLEDGE_LOOKUP_TASK.to_string());

        tasks.extend(
            generated
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty() && !is_knowledge_lookup_task(t)),
        );
        tasks.truncate(max_tasks);

        Self { tasks }
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tasks.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether the plan contains investigation work beyond the lookup
    pub fn has_investigation_tasks(&self) -> bool {
        self.tasks.len() > 1
    }
}

/// Whether a task description is a restatement of the knowledge lookup task
pub fn is_knowledge_lookup_task(task: &str) -> bool {
    let lower = task.to_lowercase();
    lower.contains("similar")
        && (lower.contains("incident") || lower.contains("past") || lower.contains("historical"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_knowledge_lookup_prepended() {
        let plan = Plan::with_knowledge_lookup(
            tasks(&["Inspect pod logs", "Review resource limits"]),
            5,
        );

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.get(0), Some(KNOWLEDGE_LOOKUP_TASK));
        assert_eq!(plan.get(1), Some("Inspect pod logs"));
    }

    #[test]
    fn test_generated_lookup_task_dropped() {
        let plan = Plan::with_knowledge_lookup(
            tasks(&[
                "Check for similar past incidents in the knowledge base",
                "Inspect pod logs",
                "Review resource limits",
            ]),
            5,
        );

        assert_eq!(
            plan.tasks(),
            &tasks(&[KNOWLEDGE_LOOKUP_TASK, "Inspect pod logs", "Review resource limits"])[..]
        );
    }

    #[test]
    fn test_truncated_to_cap() {
        let plan = Plan::with_knowledge_lookup(
            tasks(&["a", "b", "c", "d", "e", "f"]),
            4,
        );

        assert_eq!(plan.len(), 4);
        assert_eq!(plan.get(3), Some("c"));
    }

    #[test]
    fn test_cap_never_below_minimum() {
        let plan = Plan::with_knowledge_lookup(tasks(&["a", "b", "c"]), 1);
        assert_eq!(plan.len(), MIN_PLAN_TASKS);
        assert!(plan.has_investigation_tasks());
    }

    #[test]
    fn test_is_knowledge_lookup_task() {
        assert!(is_knowledge_lookup_task("Check similar past incidents"));
        assert!(is_knowledge_lookup_task("Search for SIMILAR historical alerts"));
        assert!(!is_knowledge_lookup_task("Check pod logs"));
        assert!(!is_knowledge_lookup_task("Compare with similar pods"));
    }
}
