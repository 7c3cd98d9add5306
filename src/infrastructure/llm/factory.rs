use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::http_client::HttpClient;
use super::openai::{OpenAiProvider, DEFAULT_OPENAI_BASE_URL};
use super::ProviderCompletionClient;
use crate::domain::{CompletionClient, DomainError, LlmProvider};

/// Completion backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmProviderConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// API key; falls back to `OPENAI_API_KEY` when empty
    pub api_key: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub system_prompt: Option<String>,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 60,
            system_prompt: None,
        }
    }
}

impl LlmProviderConfig {
    fn resolve_api_key(&self) -> Result<String, DomainError> {
        if !self.api_key.trim().is_empty() {
            return Ok(self.api_key.clone());
        }

        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DomainError::configuration(
                    "No LLM API key configured (set llm.api_key or OPENAI_API_KEY)",
                )
            })
    }
}

/// Factory for creating completion backends
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create the chat provider described by the configuration
    pub fn create_provider(
        config: &LlmProviderConfig,
    ) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let api_key = config.resolve_api_key()?;
        let http_client =
            HttpClient::with_timeout(Duration::from_secs(config.request_timeout_secs.max(1)))?;

        Ok(Arc::new(OpenAiProvider::with_base_url(
            http_client,
            api_key,
            &config.base_url,
        )))
    }

    /// Create the completion client consumed by workflow stages
    pub fn create_completion_client(
        config: &LlmProviderConfig,
    ) -> Result<Arc<dyn CompletionClient>, DomainError> {
        if config.model.trim().is_empty() {
            return Err(DomainError::configuration("llm.model cannot be empty"));
        }

        let provider = Self::create_provider(config)?;
        let mut client = ProviderCompletionClient::new(provider, &config.model);

        if let Some(system) = &config.system_prompt {
            client = client.with_system_prompt(system);
        }

        Ok(Arc::new(client))
    }
}
