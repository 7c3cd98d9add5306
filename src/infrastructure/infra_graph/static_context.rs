use async_trait::async_trait;

use crate::domain::{Alert, ContextResolver, DomainError, InfraContext};

/// Returns the same context for every alert
#[derive(Debug, Clone, Default)]
pub struct StaticContextResolver {
    context: InfraContext,
}

impl StaticContextResolver {
    pub fn new(context: InfraContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ContextResolver for StaticContextResolver {
    async fn resolve_context(&self, _alert: &Alert) -> Result<InfraContext, DomainError> {
        Ok(self.context.clone())
    }
}
