//! Alert processing endpoint

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::triage::{Alert, Recommendation};
use crate::infrastructure::triage::StepRecord;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertQueryParams {
    /// Include the per-step trace in the response
    #[serde(default)]
    pub trace: bool,
}

/// Response returned when `?trace=true` is set
#[derive(Debug, Clone, Serialize)]
pub struct TracedRecommendation {
    pub run_id: Uuid,
    pub recommendation: Recommendation,
    pub steps: Vec<StepRecord>,
    pub execution_time_ms: u64,
}

/// POST /api/v1/alerts
pub async fn process_alert(
    State(state): State<AppState>,
    Query(params): Query<AlertQueryParams>,
    Json(alert): Json<Alert>,
) -> Result<Response, ApiError> {
    debug!(
        alert_id = %alert.id,
        alert_type = %alert.alert_type,
        trace = params.trace,
        "Received alert"
    );

    let run = state.alert_service.process_detailed(alert).await?;

    if params.trace {
        let response = TracedRecommendation {
            run_id: run.run_id,
            recommendation: run.recommendation,
            steps: run.steps,
            execution_time_ms: run.execution_time_ms,
        };
        return Ok(Json(response).into_response());
    }

    Ok(Json(run.recommendation).into_response())
}
