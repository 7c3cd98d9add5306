use thiserror::Error;

/// Errors raised by collaborators (completion, similarity search, context resolution)
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("Completion error: {provider} - {message}")]
    Completion {
        provider: String,
        message: String,
        transient: bool,
    },

    #[error("Search error: {message}")]
    Search { message: String, transient: bool },

    #[error("Context resolution error: {message}")]
    Context { message: String },

    #[error("Timeout in '{operation}' after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    /// Permanent completion failure (bad request, malformed response)
    pub fn completion(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Completion {
            provider: provider.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Completion failure worth retrying (rate limit, 5xx, connection reset)
    pub fn completion_transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Completion {
            provider: provider.into(),
            message: message.into(),
            transient: true,
        }
    }

    pub fn search(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
            transient: false,
        }
    }

    pub fn search_transient(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
            transient: true,
        }
    }

    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the failure may succeed when retried with the same input
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Completion { transient, .. } | Self::Search { transient, .. } => *transient,
            Self::Timeout { .. } => true,
            Self::Context { .. }
            | Self::Validation { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => false,
        }
    }
}
