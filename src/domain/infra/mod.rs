//! Infrastructure topology context for alerts

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::{Map, Value};

use crate::domain::triage::Alert;
use crate::domain::DomainError;

/// Resolved infrastructure context; an ordered JSON object
pub type InfraContext = Map<String, Value>;

/// Looks up the part of the infrastructure graph an alert refers to
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContextResolver: Send + Sync {
    /// Resolve context for the alert. An empty map means nothing matched;
    /// errors are reserved for hard infrastructure failures.
    async fn resolve_context(&self, alert: &Alert) -> Result<InfraContext, DomainError>;
}
