use serde::{Deserialize, Serialize};

use crate::domain::incident::Incident;

/// Terminal output of a workflow run. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub alert_id: String,
    pub alert_type: String,
    pub recommendation_text: String,
    /// Incidents the recommendation relies on; always a subset of the
    /// incidents found during knowledge lookup
    pub similar_incidents: Vec<Incident>,
    /// Plan entries that were actually run, in order
    pub completed_tasks: Vec<String>,
}
