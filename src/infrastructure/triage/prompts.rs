//! Prompt templates for the LLM-backed stages

use once_cell::sync::Lazy;

use crate::domain::triage::{StageFailure, WorkflowState};
use crate::domain::{Incident, PromptTemplate, PromptValues};

static PLANNING: Lazy<PromptTemplate> = Lazy::new(|| {
    PromptTemplate::parse(
        r#"You are an expert SRE responsible for creating an investigation plan for alerts.

## ALERT INFORMATION
Type: ${var:alert-type}
Summary: ${var:alert-summary}
Details: ${var:alert-details}

## INFRASTRUCTURE CONTEXT
${var:infra-context}

Create a sequential investigation plan with ${var:min-tasks}-${var:max-tasks} specific tasks to diagnose and resolve this alert.
Similar past incidents are already checked first; do not include that task.
Format your response as a numbered list of tasks only."#,
    )
});

static TASK_EXECUTION: Lazy<PromptTemplate> = Lazy::new(|| {
    PromptTemplate::parse(
        r#"You are an expert SRE responsible for investigating alerts.

## ALERT INFORMATION
Type: ${var:alert-type}
Summary: ${var:alert-summary}
Details: ${var:alert-details}

## INFRASTRUCTURE CONTEXT
${var:infra-context}

## SIMILAR PAST INCIDENTS
${var:similar-incidents}

## CURRENT TASK
${var:current-task}

## COMPLETED TASKS
${var:completed-tasks}

## PREVIOUS TASK RESULTS
${var:previous-results}

Execute the current task and provide detailed findings. Be specific about what you discovered
and the technical steps needed to investigate this issue. Think about:

1. What commands, logs, or metrics would you check?
2. What patterns or anomalies would you look for?
3. What specific impact is this issue having?
4. What is the root cause based on the evidence?"#,
    )
});

static REFLECTION: Lazy<PromptTemplate> = Lazy::new(|| {
    PromptTemplate::parse(
        r#"You are an expert SRE responsible for critical reflection on alert investigation.

## ALERT INFORMATION
Type: ${var:alert-type}
Summary: ${var:alert-summary}
Details: ${var:alert-details}

## CURRENT TASK
${var:current-task}

## TASK RESULT
${var:task-result}

## REFLECTION INSTRUCTIONS
Analyze the task result and provide a concise reflection on:
1. What was learned from this task
2. How this information impacts the investigation
3. What insights have been gained about the potential root cause

Make your reflection concise, technical, and actionable."#,
    )
});

static RECOMMENDATION: Lazy<PromptTemplate> = Lazy::new(|| {
    PromptTemplate::parse(
        r#"You are an expert SRE responsible for providing solution recommendations for alerts.

## ALERT INFORMATION
Type: ${var:alert-type}
Summary: ${var:alert-summary}
Details: ${var:alert-details}

## INFRASTRUCTURE CONTEXT
${var:infra-context}

## SIMILAR PAST INCIDENTS
${var:similar-incidents}

## INVESTIGATION FINDINGS
Completed Tasks:
${var:completed-tasks}

Task Results:
${var:task-results}

Reflections:
${var:reflections}

## OUTPUT INSTRUCTIONS
Based on all available information, provide:
1. A concise summary of the investigation findings
2. A detailed solution recommendation with specific steps to resolve the issue
3. Any preventive measures to avoid similar issues in the future

${var:citation-instructions}"#,
    )
});

const NONE: &str = "None";

/// Tag used to cite an incident in model output
pub(crate) fn incident_tag(id: &str) -> String {
    format!("[incident:{}]", id)
}

fn alert_values(state: &WorkflowState) -> PromptValues {
    let alert = state.alert();
    PromptValues::new()
        .with("alert-type", &alert.alert_type)
        .with("alert-summary", &alert.summary)
        .with("alert-details", &alert.details)
}

fn infra_context(state: &WorkflowState) -> String {
    if state.infra_context().is_empty() {
        return "No infrastructure context available".to_string();
    }

    serde_json::to_string_pretty(state.infra_context())
        .unwrap_or_else(|_| "Infrastructure context could not be rendered".to_string())
}

fn similar_incidents(incidents: &[Incident]) -> String {
    if incidents.is_empty() {
        return NONE.to_string();
    }

    incidents
        .iter()
        .map(|incident| {
            format!(
                "{}\nIncident: {}\nResolution: {}\nSimilarity: {:.2}\n",
                incident_tag(&incident.id),
                incident.error_text,
                incident.solution_text,
                incident.similarity_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn citation_instructions(incidents: &[Incident]) -> String {
    match incidents.first() {
        Some(first) => format!(
            "When you rely on a past incident, cite it exactly as it is tagged above, e.g. {}.\n\
             Only cite incidents listed above.",
            incident_tag(&first.id)
        ),
        None => "No past incidents are available. Do not cite any incidents.".to_string(),
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return NONE.to_string();
    }

    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn task_results(state: &WorkflowState) -> String {
    let Some(plan) = state.plan() else {
        return NONE.to_string();
    };

    if state.task_results().is_empty() {
        return NONE.to_string();
    }

    state
        .task_results()
        .iter()
        .map(|(index, result)| {
            format!(
                "Task: {}\nResult: {}\n",
                plan.get(*index).unwrap_or("Unknown"),
                result
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render(template: &PromptTemplate, values: PromptValues) -> Result<String, StageFailure> {
    template
        .render(&values)
        .map_err(|e| StageFailure::invariant(format!("Prompt rendering failed: {}", e)))
}

pub(crate) fn planning(
    state: &WorkflowState,
    max_tasks: usize,
) -> Result<String, StageFailure> {
    // The lookup task occupies one slot of the plan
    let max_generated = max_tasks.saturating_sub(1).max(1);
    let min_generated = max_generated.min(2);

    render(
        &PLANNING,
        alert_values(state)
            .with("infra-context", infra_context(state))
            .with("min-tasks", min_generated.to_string())
            .with("max-tasks", max_generated.to_string()),
    )
}

pub(crate) fn task_execution(state: &WorkflowState, task: &str) -> Result<String, StageFailure> {
    let previous_results = state
        .task_results()
        .iter()
        .map(|(index, result)| format!("Task {} Result: {}", index + 1, result))
        .collect::<Vec<_>>();

    render(
        &TASK_EXECUTION,
        alert_values(state)
            .with("infra-context", infra_context(state))
            .with("similar-incidents", similar_incidents(state.similar_incidents()))
            .with("current-task", task)
            .with("completed-tasks", bullet_list(&state.completed_tasks()))
            .with(
                "previous-results",
                if previous_results.is_empty() {
                    NONE.to_string()
                } else {
                    previous_results.join("\n")
                },
            ),
    )
}

pub(crate) fn reflection(
    state: &WorkflowState,
    task: &str,
    task_result: &str,
) -> Result<String, StageFailure> {
    render(
        &REFLECTION,
        alert_values(state)
            .with("current-task", task)
            .with("task-result", task_result),
    )
}

pub(crate) fn recommendation(state: &WorkflowState) -> Result<String, StageFailure> {
    let reflections = state
        .reflections()
        .iter()
        .enumerate()
        .map(|(i, reflection)| format!("Reflection {}: {}", i + 1, reflection))
        .collect::<Vec<_>>();

    render(
        &RECOMMENDATION,
        alert_values(state)
            .with("infra-context", infra_context(state))
            .with("similar-incidents", similar_incidents(state.similar_incidents()))
            .with(
                "citation-instructions",
                citation_instructions(state.similar_incidents()),
            )
            .with("completed-tasks", bullet_list(&state.completed_tasks()))
            .with("task-results", task_results(state))
            .with(
                "reflections",
                if reflections.is_empty() {
                    NONE.to_string()
                } else {
                    reflections.join("\n")
                },
            ),
    )
}
