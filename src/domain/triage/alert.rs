use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::DomainError;

/// An operational alert. Created by the caller and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier for the alert
    pub id: String,
    /// Categorical tag, e.g. "PodCrashLoop" or "HighCPU"
    #[serde(rename = "type")]
    pub alert_type: String,
    pub summary: String,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Alert {
    pub fn new(
        id: impl Into<String>,
        alert_type: impl Into<String>,
        summary: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            alert_type: alert_type.into(),
            summary: summary.into(),
            details: details.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Reject alerts that cannot be routed or reported on
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("Alert id cannot be empty"));
        }

        if self.alert_type.trim().is_empty() {
            return Err(DomainError::validation("Alert type cannot be empty"));
        }

        if self.summary.trim().is_empty() && self.details.trim().is_empty() {
            return Err(DomainError::validation(
                "Alert must carry a summary or details",
            ));
        }

        Ok(())
    }

    /// Single query string used for similarity search
    pub fn search_query(&self) -> String {
        format!("{}: {} - {}", self.alert_type, self.summary, self.details)
    }
}
