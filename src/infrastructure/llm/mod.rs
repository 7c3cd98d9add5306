//! Completion backends

mod completion;
mod factory;
mod http_client;
mod openai;

pub use completion::ProviderCompletionClient;
pub use factory::{LlmProviderConfig, LlmProviderFactory};
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiProvider;
