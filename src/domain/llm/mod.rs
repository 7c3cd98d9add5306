//! LLM provider domain models and the completion contract consumed by workflow stages

mod completion;
mod message;
mod provider;
mod request;
mod response;

pub use completion::{CompletionClient, CompletionParams};
pub use message::{Message, MessageRole};
pub use provider::LlmProvider;
pub use request::{LlmRequest, LlmRequestBuilder};
pub use response::{FinishReason, LlmResponse, Usage};
