//! Domain layer - Core workflow logic and collaborator contracts

pub mod error;
pub mod incident;
pub mod infra;
pub mod llm;
pub mod prompt;
pub mod triage;

pub use error::DomainError;
pub use incident::{Incident, SimilaritySearch};
pub use infra::{ContextResolver, InfraContext};
pub use llm::{
    CompletionClient, CompletionParams, FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder,
    LlmResponse, Message, MessageRole, Usage,
};
pub use prompt::{PromptTemplate, PromptValues, PromptVariable, TemplateError};
pub use triage::{
    route, Alert, Plan, Recommendation, RetryPolicy, Route, Stage, StageContext, StageFailure,
    StageKind, StageOutput, WorkflowError, WorkflowState,
};
