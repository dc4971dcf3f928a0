//! Generation gateway trait for prompting a text-generation model.

use async_trait::async_trait;

use crate::error::Result;

/// A gateway that sends a system/user prompt pair to a text-generation service.
///
/// The returned text is raw model output. It is not guaranteed to be well-formed
/// structured data; decoding it defensively is the caller's job.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion for the given prompts.
    ///
    /// Fails with [`PolicyError::Gateway`](crate::PolicyError::Gateway) on a
    /// transport failure or a non-success response.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
