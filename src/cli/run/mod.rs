//! Run command - investigates a single alert read from a file

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::domain::triage::{Alert, Recommendation};
use crate::infrastructure::triage::{StepRecord, WorkflowRun};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Alert JSON file: `{id, type, summary, details, metadata?}`
    #[arg(long)]
    pub alert: PathBuf,

    /// Infrastructure graph JSON, overriding `infrastructure.graph_path`
    #[arg(long)]
    pub infra_graph: Option<PathBuf>,

    /// Incident corpus JSON, overriding `knowledge_base.incidents_path`
    #[arg(long)]
    pub incidents: Option<PathBuf>,

    /// Print the step trace alongside the recommendation
    #[arg(long)]
    pub trace: bool,
}

#[derive(Serialize)]
struct TracedRun<'a> {
    run_id: Uuid,
    recommendation: &'a Recommendation,
    steps: &'a [StepRecord],
    execution_time_ms: u64,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = super::bootstrap()?;

    if let Some(path) = args.infra_graph {
        config.infrastructure.graph_path = Some(path);
    }
    if let Some(path) = args.incidents {
        config.knowledge_base.incidents_path = Some(path);
    }

    let alert = read_alert(&args.alert).await?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling workflow");
            ctrl_c.cancel();
        }
    });

    let service = crate::build_alert_service(&config, cancel).await?;
    let run = service
        .process_detailed(alert)
        .await
        .context("Alert investigation failed")?;

    println!("{}", render(&run, args.trace)?);
    Ok(())
}

async fn read_alert(path: &Path) -> anyhow::Result<Alert> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read alert file {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid alert JSON in {}", path.display()))
}

fn render(run: &WorkflowRun, trace: bool) -> anyhow::Result<String> {
    let output = if trace {
        serde_json::to_string_pretty(&TracedRun {
            run_id: run.run_id,
            recommendation: &run.recommendation,
            steps: &run.steps,
            execution_time_ms: run.execution_time_ms,
        })?
    } else {
        serde_json::to_string_pretty(&run.recommendation)?
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use serde_json::{Map, Value};

    use crate::domain::Incident;
    use crate::infrastructure::triage::stages::testing::{FixedSearch, ScriptedCompletion};
    use crate::infrastructure::triage::{WorkflowConfig, WorkflowEngine};

    #[tokio::test]
    async fn test_read_alert() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"id": "a1", "type": "HighCPU", "summary": "Node n1 hot", "details": "95%"}}"#
        )
        .unwrap();

        let alert = read_alert(file.path()).await.unwrap();
        assert_eq!(alert.id, "a1");
        assert_eq!(alert.alert_type, "HighCPU");
    }

    #[tokio::test]
    async fn test_read_alert_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = read_alert(file.path()).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid alert JSON"));
    }

    #[tokio::test]
    async fn test_render_with_and_without_trace() {
        let engine = WorkflowEngine::new(
            Arc::new(ScriptedCompletion::new(
                "1. Check CPU usage\n2. Check recent deploys",
                "Scale out as in [incident:INC-2].",
            )),
            Arc::new(FixedSearch::new(vec![Incident::new(
                "INC-2",
                "CPU saturation",
                "Added replicas",
                0.7,
            )])),
            WorkflowConfig::default(),
        );
        let run = engine
            .run_detailed(
                Alert::new("a1", "HighCPU", "Node n1 hot", "95%"),
                Map::new(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let plain: Value = serde_json::from_str(&render(&run, false).unwrap()).unwrap();
        assert_eq!(plain["alert_id"], "a1");
        assert!(plain.get("steps").is_none());

        let traced: Value = serde_json::from_str(&render(&run, true).unwrap()).unwrap();
        assert_eq!(traced["recommendation"]["similar_incidents"][0]["id"], "INC-2");
        assert_eq!(traced["steps"].as_array().unwrap().len(), 8);
    }
}
