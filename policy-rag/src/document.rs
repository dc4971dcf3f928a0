//! Data types for documents, chunks, and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Store-assigned document identity.
pub type DocumentId = i64;

/// An ingested organizational document. Immutable once stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identity assigned by the store; `None` until inserted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    pub title: String,
    pub description: String,
    /// Provenance of the text, e.g. an object key or URL.
    pub source: String,
    pub mime_type: String,
    pub language: String,
    pub tags: Vec<String>,
}

/// A bounded segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Store-assigned row identity; `None` until inserted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// The owning document; `None` until inserted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    /// Zero-based position within the owning document.
    pub index: usize,
    /// The literal chunk text.
    pub text: String,
    /// Omitted from serialized retrieval results.
    #[serde(default, skip_serializing)]
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, serde_json::Value>,
    /// Distance to the query embedding. Only set on retrieval results, never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl Chunk {
    /// Create an unsaved chunk at `index` with its embedding attached.
    pub fn new(index: usize, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: None,
            document_id: None,
            index,
            text: text.into(),
            embedding,
            metadata: HashMap::new(),
            distance: None,
        }
    }
}

/// The final answer returned by [`AnswerEngine::ask`](crate::AnswerEngine::ask).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Natural-language answer text.
    pub text: String,
    /// Retrieved chunks that grounded the answer, ascending by distance.
    pub chunks: Vec<Chunk>,
}
