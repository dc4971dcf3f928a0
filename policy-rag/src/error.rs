//! Error types for the `policy-rag` crate.

use thiserror::Error;

use crate::expr::EvalError;

/// Errors that can occur while ingesting documents or answering questions.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The embedding or generation service failed or was unreachable.
    #[error("Gateway error ({service}): {message}")]
    Gateway {
        /// The gateway that produced the error.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// Ingested content produced no chunks.
    #[error("Content is empty: nothing to ingest")]
    EmptyContent,

    /// A formula could not be evaluated.
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    /// The generation output did not match the structured extraction shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// An error occurred in the document store backend.
    #[error("Document store error ({backend}): {message}")]
    Store {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The caller abandoned the request before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PolicyError {
    /// Build a [`PolicyError::Gateway`] for the named service.
    pub fn gateway(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Gateway { service: service.into(), message: message.into() }
    }

    /// Build a [`PolicyError::Store`] for the named backend.
    pub fn store(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store { backend: backend.into(), message: message.into() }
    }

    /// Whether this error came from an abandoned request rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A convenience result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
