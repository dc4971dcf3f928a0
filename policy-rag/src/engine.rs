//! Answer synthesis: embed → retrieve → prompt → parse & compute → render.
//!
//! Only embedding the question and querying the store can fail an
//! [`AnswerEngine::ask`] call. Generation, decoding and formula evaluation
//! failures degrade into a best-effort [`Answer`] that still carries the
//! retrieved chunks.
//!
//! # Example
//!
//! ```rust,ignore
//! use policy_rag::{AnswerEngine, AskRequest, PolicyConfig};
//!
//! let engine = AnswerEngine::builder()
//!     .config(PolicyConfig::default())
//!     .embedding_provider(embedder)
//!     .generation_provider(llm)
//!     .store(store)
//!     .build()?;
//!
//! let answer = engine.ask(&AskRequest::new("How much bonus after 40 months?"), &cancel).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cancel::run_cancellable;
use crate::config::PolicyConfig;
use crate::document::{Answer, Chunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{PolicyError, Result};
use crate::expr;
use crate::extraction::{self, StructuredExtraction};
use crate::generation::GenerationProvider;
use crate::prompt;
use crate::render::{self, ANALYSIS_FAILED, NO_POLICY_FOUND};
use crate::store::DocumentStore;

/// A single-turn question.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AskRequest {
    /// The question in natural language.
    pub question: String,
    /// Maximum number of grounding chunks; zero selects the configured default.
    pub max_chunks: usize,
    /// Extra instructions appended to the system prompt.
    pub system_hint: String,
}

impl AskRequest {
    /// A question with the default chunk limit and no hint.
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), ..Self::default() }
    }

    /// Set the maximum number of grounding chunks.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Set extra instructions for the system prompt.
    pub fn with_system_hint(mut self, hint: impl Into<String>) -> Self {
        self.system_hint = hint.into();
        self
    }
}

/// The question-answering orchestrator. Construct one via [`AnswerEngine::builder()`].
///
/// Holds no per-call state, so one engine can serve concurrent calls.
pub struct AnswerEngine {
    config: PolicyConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generation_provider: Arc<dyn GenerationProvider>,
    store: Arc<dyn DocumentStore>,
}

impl AnswerEngine {
    /// Create a new [`AnswerEngineBuilder`].
    pub fn builder() -> AnswerEngineBuilder {
        AnswerEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Answer a question from the stored documents.
    ///
    /// # Errors
    ///
    /// - [`PolicyError::Gateway`] if the question cannot be embedded.
    /// - [`PolicyError::Store`] if the store fails on the retry search.
    /// - [`PolicyError::Cancelled`] if `cancel` fires before the answer is ready.
    pub async fn ask(&self, request: &AskRequest, cancel: &CancellationToken) -> Result<Answer> {
        let query_embedding =
            run_cancellable(cancel, self.embedding_provider.embed(&request.question))
                .await
                .map_err(|e| {
                    if !e.is_cancelled() {
                        error!(error = %e, "embedding failed during ask");
                    }
                    e
                })?;

        let limit = match request.max_chunks {
            0 => self.config.default_max_chunks,
            n => n,
        };
        let chunks = self.retrieve(&query_embedding, limit, cancel).await?;
        if chunks.is_empty() {
            info!(result_count = 0, "no relevant policy found");
            return Ok(Answer { text: NO_POLICY_FOUND.to_string(), chunks });
        }

        let system_prompt = prompt::system_prompt(&request.system_hint);
        let user_prompt = prompt::user_prompt(&prompt::context_block(&chunks), &request.question);

        let raw = match run_cancellable(
            cancel,
            self.generation_provider.generate(&system_prompt, &user_prompt),
        )
        .await
        {
            Ok(raw) => raw,
            Err(PolicyError::Cancelled) => return Err(PolicyError::Cancelled),
            Err(e) => {
                warn!(error = %e, "generation failed, returning degraded answer");
                return Ok(Answer { text: ANALYSIS_FAILED.to_string(), chunks });
            }
        };

        let extraction = match extraction::decode(&raw) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(error = %e, raw_len = raw.len(), "could not decode generation output");
                return Ok(Answer { text: ANALYSIS_FAILED.to_string(), chunks });
            }
        };

        let result = compute(&extraction);
        let text = render::render_answer(&extraction, result);
        info!(result_count = chunks.len(), computed = result.is_some(), "answered question");
        Ok(Answer { text, chunks })
    }

    /// Search with the tight threshold, retrying once with the loose one.
    ///
    /// A failed tight search also triggers the retry; only a failed retry is fatal.
    async fn retrieve(
        &self,
        embedding: &[f32],
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Chunk>> {
        let tight = self.config.tight_distance;
        match run_cancellable(cancel, self.store.search_chunks(embedding, limit, tight)).await {
            Ok(chunks) if !chunks.is_empty() => {
                debug!(threshold = tight, result_count = chunks.len(), "retrieved chunks");
                return Ok(chunks);
            }
            Ok(_) => debug!(threshold = tight, "no chunks within tight threshold"),
            Err(PolicyError::Cancelled) => return Err(PolicyError::Cancelled),
            Err(e) => warn!(threshold = tight, error = %e, "tight search failed, retrying"),
        }

        let loose = self.config.loose_distance;
        let chunks = run_cancellable(cancel, self.store.search_chunks(embedding, limit, loose))
            .await
            .map_err(|e| {
                if !e.is_cancelled() {
                    error!(threshold = loose, error = %e, "document store search failed");
                }
                e
            })?;
        debug!(threshold = loose, result_count = chunks.len(), "retrieved chunks on retry");
        Ok(chunks)
    }
}

/// Evaluate the extracted formula when both a formula and variables are present.
///
/// Evaluation failures are logged and treated as "no computed result".
fn compute(extraction: &StructuredExtraction) -> Option<f64> {
    let formula = extraction.formula()?;
    let variables = extraction.variables()?;
    match expr::evaluate(formula, variables) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(formula, error = %PolicyError::from(e), "formula evaluation failed");
            None
        }
    }
}

/// Builder for constructing an [`AnswerEngine`].
///
/// The two gateways and the store are required; the config defaults to
/// [`PolicyConfig::default`].
#[derive(Default)]
pub struct AnswerEngineBuilder {
    config: Option<PolicyConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl AnswerEngineBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: PolicyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Set the document store.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the [`AnswerEngine`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Config`] if a required field is missing or the
    /// config is invalid.
    pub fn build(self) -> Result<AnswerEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| PolicyError::Config("embedding_provider is required".to_string()))?;
        let generation_provider = self
            .generation_provider
            .ok_or_else(|| PolicyError::Config("generation_provider is required".to_string()))?;
        let store =
            self.store.ok_or_else(|| PolicyError::Config("store is required".to_string()))?;

        Ok(AnswerEngine { config, embedding_provider, generation_provider, store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Value, Variables};
    use crate::extraction::Unit;

    fn extraction(formula: Option<&str>, vars: &[(&str, f64)]) -> StructuredExtraction {
        StructuredExtraction {
            explanation: "x".to_string(),
            formula_expression: formula.map(str::to_string),
            variables: Some(
                vars.iter().map(|(k, v)| (k.to_string(), Value::Number(*v))).collect::<Variables>(),
            ),
            unit: Unit::default(),
        }
    }

    #[test]
    fn computes_only_with_formula_and_variables() {
        assert_eq!(compute(&extraction(Some("a * 2"), &[("a", 2.0)])), Some(4.0));
        assert_eq!(compute(&extraction(None, &[("a", 2.0)])), None);
        // An empty variable map skips evaluation even for constant formulas.
        assert_eq!(compute(&extraction(Some("1 + 1"), &[])), None);
    }

    #[test]
    fn evaluation_failure_is_swallowed() {
        assert_eq!(compute(&extraction(Some("missing * 2"), &[("a", 1.0)])), None);
        assert_eq!(compute(&extraction(Some("a / 0"), &[("a", 1.0)])), None);
    }

    #[test]
    fn builder_requires_ports() {
        assert!(matches!(AnswerEngine::builder().build(), Err(PolicyError::Config(_))));
    }
}
