//! # policy-rag
//!
//! Policy-aware question answering over ingested organizational documents.
//!
//! ## Overview
//!
//! Documents are split into boundary-aware chunks, embedded, and stored with
//! their vectors. A question is embedded, matched against stored chunks with an
//! adaptive distance threshold, and sent with the retrieved context to a
//! generation model that must answer with a structured payload. When that
//! payload carries a formula, it is evaluated by a sandboxed evaluator and the
//! result is rendered with unit-aware phrasing.
//!
//! - [`IngestionPipeline`] - chunk → embed → atomic insert
//! - [`AnswerEngine`] - embed → retrieve → prompt → parse & compute → render
//! - [`expr`] - closed-grammar arithmetic evaluator
//!
//! External services sit behind the [`EmbeddingProvider`],
//! [`GenerationProvider`] and [`DocumentStore`] traits. Enable the `ollama`
//! feature for HTTP gateways and the `pgvector` feature for a PostgreSQL store.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use policy_rag::{AnswerEngine, AskRequest, InMemoryDocumentStore};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let engine = AnswerEngine::builder()
//!     .embedding_provider(embedder.clone())
//!     .generation_provider(llm)
//!     .store(store)
//!     .build()?;
//!
//! let answer = engine.ask(&AskRequest::new("How many leave days?"), &CancellationToken::new()).await?;
//! println!("{}", answer.text);
//! ```

mod cancel;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod expr;
pub mod extraction;
pub mod generation;
pub mod ingest;
pub mod inmemory;
pub mod prompt;
pub mod render;
pub mod store;

#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chunking::{BoundaryChunker, Chunker, chunk_text};
pub use config::{PolicyConfig, PolicyConfigBuilder};
pub use document::{Answer, Chunk, Document, DocumentId};
pub use embedding::EmbeddingProvider;
pub use engine::{AnswerEngine, AnswerEngineBuilder, AskRequest};
pub use error::{PolicyError, Result};
pub use expr::{EvalError, Expression, Value, Variables};
pub use extraction::{StructuredExtraction, Unit};
pub use generation::GenerationProvider;
pub use ingest::{IngestRequest, IngestionPipeline, IngestionPipelineBuilder};
pub use inmemory::InMemoryDocumentStore;
pub use store::DocumentStore;
