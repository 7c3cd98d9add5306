//! Versioned API endpoints

pub mod alerts;

use axum::{routing::post, Router};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new().route("/alerts", post(alerts::process_alert))
}
