use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::Incident;
use crate::domain::DomainError;

/// Similarity search over past incidents
///
/// Backed by a vector store in production. Shared by concurrent workflow runs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return up to `k` incidents similar to `query`
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Incident>, DomainError>;
}
