//! SRE Agent
//!
//! Investigates operational alerts with a bounded, multi-stage workflow:
//! - Planning of investigation tasks from the alert and its infrastructure context
//! - Lookup of similar past incidents
//! - Task execution with a reflection after every finding
//! - A final recommendation citing the incidents it relies on

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use serde_json::Map;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use domain::{ContextResolver, DomainError};
use infrastructure::{
    incident::InMemoryIncidentIndex,
    infra_graph::{InfrastructureGraph, InfrastructureGraphResolver, StaticContextResolver},
    llm::LlmProviderFactory,
    services::AlertService,
    triage::WorkflowEngine,
};

/// Wire the alert service from configuration.
///
/// `shutdown` cancels every run started through the returned service.
pub async fn build_alert_service(
    config: &AppConfig,
    shutdown: CancellationToken,
) -> Result<AlertService, DomainError> {
    let completion = LlmProviderFactory::create_completion_client(&config.llm)?;

    let index = match &config.knowledge_base.incidents_path {
        Some(path) => InMemoryIncidentIndex::from_file(path).await?,
        None => {
            warn!("No incident corpus configured; knowledge lookup will find nothing");
            InMemoryIncidentIndex::new()
        }
    };
    info!(incidents = index.len(), "Incident index ready");

    let resolver: Arc<dyn ContextResolver> = match &config.infrastructure.graph_path {
        Some(path) => Arc::new(InfrastructureGraphResolver::new(
            InfrastructureGraph::from_file(path).await?,
        )),
        None => Arc::new(StaticContextResolver::new(Map::new())),
    };

    let engine = WorkflowEngine::new(completion, Arc::new(index), config.workflow.clone());

    Ok(AlertService::new(resolver, Arc::new(engine)).with_shutdown(shutdown))
}
