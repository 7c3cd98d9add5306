//! Application state shared by the handlers

use std::sync::Arc;

use crate::infrastructure::services::AlertService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub alert_service: Arc<AlertService>,
}

impl AppState {
    pub fn new(alert_service: Arc<AlertService>) -> Self {
        Self { alert_service }
    }
}
