//! Embedding gateway trait for turning text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// A gateway that maps text to a fixed-dimension embedding vector.
///
/// Implementations wrap an external embedding service. Each call performs at most
/// one blocking request; callers must not assume results are cached.
///
/// # Example
///
/// ```rust,ignore
/// use policy_rag::EmbeddingProvider;
///
/// let embedding = provider.embed("How many leave days do I get?").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    ///
    /// Fails with [`PolicyError::Gateway`](crate::PolicyError::Gateway) on a
    /// transport failure or a non-success response.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
