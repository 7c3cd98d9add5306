//! API error types and mapping from service errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::triage::{StageFailure, WorkflowError};
use crate::infrastructure::services::AlertServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    InvalidOutputError,
    UpstreamError,
    ServerError,
    ServiceUnavailableError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::InvalidOutputError => write!(f, "invalid_output_error"),
            Self::UpstreamError => write!(f, "upstream_error"),
            Self::ServerError => write!(f, "server_error"),
            Self::ServiceUnavailableError => write!(f, "service_unavailable_error"),
        }
    }
}

/// Error response body: `{ "error": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Stage that failed, when the error came out of a workflow run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    code: None,
                    stage: None,
                },
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.error.code = Some(code.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.response.error.stage = Some(stage.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorType::InvalidOutputError,
            message,
        )
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, ApiErrorType::UpstreamError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorType::ServerError, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorType::ServiceUnavailableError,
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();

        let api_error = match &err {
            WorkflowError::Stage { cause, .. } => match cause {
                StageFailure::InvalidPlan(_) => {
                    Self::unprocessable(message).with_code("invalid_plan")
                }
                StageFailure::InvalidOutput(_) => {
                    Self::unprocessable(message).with_code("invalid_output")
                }
                StageFailure::InvariantViolation(_) => {
                    Self::unprocessable(message).with_code("invariant_violation")
                }
                StageFailure::Transient(_) => {
                    Self::bad_gateway(message).with_code("retries_exhausted")
                }
                StageFailure::Collaborator(_) => {
                    Self::bad_gateway(message).with_code("collaborator_error")
                }
                StageFailure::Cancelled => Self::unavailable(message).with_code("cancelled"),
            },
            WorkflowError::Exhausted { .. } => Self::internal(message).with_code("step_ceiling"),
            WorkflowError::Cancelled { .. } => Self::unavailable(message).with_code("cancelled"),
        };

        match err.failed_stage() {
            Some(stage) => api_error.with_stage(stage.as_str()),
            None => api_error,
        }
    }
}

impl From<AlertServiceError> for ApiError {
    fn from(err: AlertServiceError) -> Self {
        match err {
            AlertServiceError::InvalidAlert(e) => {
                Self::bad_request(e.to_string()).with_code("invalid_alert")
            }
            err @ AlertServiceError::Context { .. } => {
                Self::bad_gateway(err.to_string()).with_code("context_error")
            }
            AlertServiceError::Workflow(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.error.error_type, self.response.error.message
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::triage::{Alert, StageKind, WorkflowState};
    use crate::domain::DomainError;
    use serde_json::Map;

    fn snapshot() -> WorkflowState {
        WorkflowState::new(Alert::new("a1", "HighCPU", "cpu", "high"), Map::new())
    }

    fn stage_error(cause: StageFailure) -> ApiError {
        WorkflowError::stage(StageKind::Planning, cause, 1, &snapshot()).into()
    }

    #[test]
    fn test_stage_failure_status_mapping() {
        let err = stage_error(StageFailure::invalid_plan("one line"));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.response.error.code.as_deref(), Some("invalid_plan"));
        assert_eq!(err.response.error.stage.as_deref(), Some("planning"));

        let err = stage_error(StageFailure::invalid_output("blank"));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let err = stage_error(StageFailure::Transient("429".to_string()));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let err = stage_error(StageFailure::Collaborator("400".to_string()));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.response.error.error_type, ApiErrorType::UpstreamError);
    }

    #[test]
    fn test_terminal_workflow_errors() {
        let err: ApiError = WorkflowError::exhausted(12, &snapshot()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.response.error.stage.is_none());

        let err: ApiError =
            WorkflowError::cancelled(Some(StageKind::Reflection), &snapshot()).into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.response.error.stage.as_deref(), Some("reflection"));
    }

    #[test]
    fn test_service_error_mapping() {
        let err: ApiError =
            AlertServiceError::InvalidAlert(DomainError::validation("Alert id cannot be empty"))
                .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.response.error.code.as_deref(), Some("invalid_alert"));

        let err: ApiError = AlertServiceError::Context {
            cause: DomainError::context("graph down").into(),
            attempts: 1,
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_error_body_shape() {
        let err = ApiError::bad_request("bad alert").with_code("invalid_alert");
        let json = serde_json::to_value(&err.response).unwrap();

        assert_eq!(json["error"]["message"], "bad alert");
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["code"], "invalid_alert");
        assert!(json["error"].get("stage").is_none());
    }
}
