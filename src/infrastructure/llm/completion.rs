use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{CompletionClient, CompletionParams, DomainError, LlmProvider, LlmRequest};

/// Adapts a chat provider to the single-prompt completion contract.
///
/// Each prompt is sent as one user message, optionally preceded by a fixed
/// system message.
pub struct ProviderCompletionClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
    system_prompt: Option<String>,
}

impl ProviderCompletionClient {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for ProviderCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCompletionClient")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl CompletionClient for ProviderCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        params: CompletionParams,
    ) -> Result<String, DomainError> {
        let mut builder = LlmRequest::builder();
        if let Some(system) = &self.system_prompt {
            builder = builder.system(system.as_str());
        }

        let request = builder
            .user(prompt)
            .temperature(params.temperature)
            .max_tokens(params.max_tokens)
            .build();

        let response = self.provider.chat(&self.model, request).await?;

        debug!(
            provider = self.provider.provider_name(),
            model = %self.model,
            finish_reason = ?response.finish_reason,
            "Completion received"
        );

        Ok(response.content().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LlmResponse, Message, MessageRole};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingProvider {
        requests: Mutex<Vec<(String, LlmRequest)>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
            self.requests
                .lock()
                .unwrap()
                .push((model.to_string(), request));
            Ok(LlmResponse::new(
                "r1".to_string(),
                model.to_string(),
                Message::assistant("finding"),
            ))
        }

        fn provider_name(&self) -> &'static str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_complete_sends_prompt_and_params() {
        let provider = Arc::new(RecordingProvider::default());
        let client = ProviderCompletionClient::new(provider.clone(), "gpt-4o-mini")
            .with_system_prompt("You are an expert SRE");

        let text = client
            .complete("Inspect logs", CompletionParams::new(0.3, 512))
            .await
            .unwrap();
        assert_eq!(text, "finding");

        let requests = provider.requests.lock().unwrap();
        let (model, request) = &requests[0];
        assert_eq!(model, "gpt-4o-mini");
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.messages[1].content, "Inspect logs");
    }
}
