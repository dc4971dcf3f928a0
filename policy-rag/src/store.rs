//! Document store trait for persisting chunks and searching by vector distance.

use async_trait::async_trait;

use crate::document::{Chunk, Document, DocumentId};
use crate::error::Result;

/// A storage backend for documents and their embedded chunks.
///
/// # Example
///
/// ```rust,ignore
/// use policy_rag::{DocumentStore, InMemoryDocumentStore};
///
/// let store = InMemoryDocumentStore::new();
/// let id = store.insert_document_with_chunks(&document, &chunks).await?;
/// let hits = store.search_chunks(&query_embedding, 5, 0.35).await?;
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a document together with all of its chunks.
    ///
    /// Atomic: on success the document and every chunk are visible, on failure
    /// none of them are. Returns the identity assigned to the document.
    async fn insert_document_with_chunks(
        &self,
        document: &Document,
        chunks: &[Chunk],
    ) -> Result<DocumentId>;

    /// Return at most `limit` chunks whose distance to `embedding` is at most
    /// `max_distance`, ordered by ascending distance.
    ///
    /// Smaller distances mean more similar chunks. Each returned chunk has its
    /// `distance` field set.
    async fn search_chunks(
        &self,
        embedding: &[f32],
        limit: usize,
        max_distance: f32,
    ) -> Result<Vec<Chunk>>;
}
