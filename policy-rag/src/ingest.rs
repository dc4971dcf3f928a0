//! Document ingestion pipeline.
//!
//! The [`IngestionPipeline`] composes a [`Chunker`], an [`EmbeddingProvider`] and
//! a [`DocumentStore`]: chunk → embed every chunk → insert once.
//!
//! # Example
//!
//! ```rust,ignore
//! use policy_rag::{IngestionPipeline, IngestRequest, InMemoryDocumentStore, PolicyConfig};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(PolicyConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .store(Arc::new(InMemoryDocumentStore::new()))
//!     .build()?;
//!
//! let id = pipeline.ingest(&request, &CancellationToken::new()).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cancel::run_cancellable;
use crate::chunking::{BoundaryChunker, Chunker};
use crate::config::PolicyConfig;
use crate::document::{Chunk, Document, DocumentId};
use crate::embedding::EmbeddingProvider;
use crate::error::{PolicyError, Result};
use crate::store::DocumentStore;

/// A document to ingest: descriptive fields plus its full text content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestRequest {
    pub title: String,
    pub description: String,
    pub source: String,
    pub mime_type: String,
    pub language: String,
    pub tags: Vec<String>,
    pub content: String,
}

impl IngestRequest {
    fn document(&self) -> Document {
        Document {
            id: None,
            title: self.title.clone(),
            description: self.description.clone(),
            source: self.source.clone(),
            mime_type: self.mime_type.clone(),
            language: self.language.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// The ingestion orchestrator. Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn DocumentStore>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Ingest a document: chunk → embed → store.
    ///
    /// Every chunk is embedded before the store is touched, and the store is
    /// called exactly once, so the document lands with all of its chunks or not
    /// at all.
    ///
    /// # Errors
    ///
    /// - [`PolicyError::EmptyContent`] if the content yields no chunks; no
    ///   gateway or store call is made.
    /// - [`PolicyError::Gateway`] if any chunk fails to embed.
    /// - [`PolicyError::Store`] if the insert fails.
    /// - [`PolicyError::Cancelled`] if `cancel` fires first.
    pub async fn ingest(
        &self,
        request: &IngestRequest,
        cancel: &CancellationToken,
    ) -> Result<DocumentId> {
        let texts = self.chunker.chunk(&request.content);
        if texts.is_empty() {
            error!(document.title = %request.title, "refusing to ingest empty content");
            return Err(PolicyError::EmptyContent);
        }

        let mut chunks = Vec::with_capacity(texts.len());
        for (index, text) in texts.into_iter().enumerate() {
            let embedding =
                run_cancellable(cancel, self.embedding_provider.embed(&text)).await.map_err(|e| {
                    if !e.is_cancelled() {
                        error!(
                            document.title = %request.title,
                            chunk.index = index,
                            error = %e,
                            "embedding failed during ingestion"
                        );
                    }
                    e
                })?;
            chunks.push(Chunk::new(index, text, embedding));
        }

        let document = request.document();
        let document_id = run_cancellable(
            cancel,
            self.store.insert_document_with_chunks(&document, &chunks),
        )
        .await
        .map_err(|e| {
            if !e.is_cancelled() {
                error!(
                    document.title = %request.title,
                    error = %e,
                    "insert failed during ingestion"
                );
            }
            e
        })?;

        info!(document.id = document_id, chunk_count = chunks.len(), "ingested document");
        Ok(document_id)
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// The embedding provider and store are required. Without an explicit chunker a
/// [`BoundaryChunker`] is built from the config (or [`PolicyConfig::default`]).
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<PolicyConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl IngestionPipelineBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: PolicyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the document store.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the [`IngestionPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Config`] if a required field is missing or the
    /// config is invalid.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| PolicyError::Config("embedding_provider is required".to_string()))?;
        let store =
            self.store.ok_or_else(|| PolicyError::Config("store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(
                BoundaryChunker::new(config.chunk_size).with_lookback(config.chunk_lookback),
            )
        });

        Ok(IngestionPipeline { chunker, embedding_provider, store })
    }
}
