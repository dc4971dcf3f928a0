//! In-memory document store using Euclidean distance.
//!
//! This module provides [`InMemoryDocumentStore`], a zero-dependency store backed
//! by a single `tokio::sync::RwLock`. It is suitable for development, testing,
//! and small corpora.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, Document, DocumentId};
use crate::error::{PolicyError, Result};
use crate::store::DocumentStore;

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct State {
    next_document_id: DocumentId,
    next_chunk_id: i64,
    dimensions: Option<usize>,
    documents: BTreeMap<DocumentId, Document>,
    chunks: Vec<Chunk>,
}

/// An in-memory [`DocumentStore`] ranking chunks by Euclidean (L2) distance.
///
/// Inserts validate every chunk before taking effect and happen under one write
/// lock, so readers never observe a partially inserted document.
///
/// # Example
///
/// ```rust,ignore
/// use policy_rag::{DocumentStore, InMemoryDocumentStore};
///
/// let store = InMemoryDocumentStore::new();
/// store.insert_document_with_chunks(&document, &chunks).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn document_count(&self) -> usize {
        self.state.read().await.documents.len()
    }

    /// Number of stored chunks across all documents.
    pub async fn chunk_count(&self) -> usize {
        self.state.read().await.chunks.len()
    }

    /// Fetch a stored document by id.
    pub async fn document(&self, id: DocumentId) -> Option<Document> {
        self.state.read().await.documents.get(&id).cloned()
    }
}

/// Compute the Euclidean distance between two vectors of equal length.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

fn validate_chunks(chunks: &[Chunk], expected: Option<usize>) -> Result<Option<usize>> {
    let mut dimensions = expected;
    for (position, chunk) in chunks.iter().enumerate() {
        if chunk.index != position {
            return Err(PolicyError::store(
                BACKEND,
                format!("chunk at position {position} has index {}", chunk.index),
            ));
        }
        if chunk.embedding.is_empty() {
            return Err(PolicyError::store(
                BACKEND,
                format!("chunk {position} has no embedding"),
            ));
        }
        match dimensions {
            Some(dims) if dims != chunk.embedding.len() => {
                return Err(PolicyError::store(
                    BACKEND,
                    format!(
                        "chunk {position} has {} dimensions, expected {dims}",
                        chunk.embedding.len()
                    ),
                ));
            }
            Some(_) => {}
            None => dimensions = Some(chunk.embedding.len()),
        }
    }
    Ok(dimensions)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_document_with_chunks(
        &self,
        document: &Document,
        chunks: &[Chunk],
    ) -> Result<DocumentId> {
        let mut state = self.state.write().await;
        let dimensions = validate_chunks(chunks, state.dimensions)?;

        state.next_document_id += 1;
        let document_id = state.next_document_id;

        let mut stored = document.clone();
        stored.id = Some(document_id);
        state.documents.insert(document_id, stored);

        for chunk in chunks {
            state.next_chunk_id += 1;
            let mut row = chunk.clone();
            row.id = Some(state.next_chunk_id);
            row.document_id = Some(document_id);
            row.distance = None;
            state.chunks.push(row);
        }
        state.dimensions = dimensions;

        debug!(document.id = document_id, chunk_count = chunks.len(), "inserted document");
        Ok(document_id)
    }

    async fn search_chunks(
        &self,
        embedding: &[f32],
        limit: usize,
        max_distance: f32,
    ) -> Result<Vec<Chunk>> {
        let state = self.state.read().await;
        if let Some(dims) = state.dimensions {
            if dims != embedding.len() {
                return Err(PolicyError::store(
                    BACKEND,
                    format!("query has {} dimensions, expected {dims}", embedding.len()),
                ));
            }
        }

        let mut hits: Vec<Chunk> = state
            .chunks
            .iter()
            .filter_map(|chunk| {
                let distance = l2_distance(&chunk.embedding, embedding);
                (distance <= max_distance).then(|| {
                    let mut hit = chunk.clone();
                    hit.distance = Some(distance);
                    hit
                })
            })
            .collect();

        // Ties break on insertion order so repeated queries are stable.
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}
