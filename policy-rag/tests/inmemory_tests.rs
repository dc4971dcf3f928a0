//! Property tests for in-memory document store search.

use policy_rag::inmemory::l2_distance;
use policy_rag::{Chunk, Document, DocumentStore, InMemoryDocumentStore};
use proptest::prelude::*;

const DIM: usize = 8;

fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
}

/// Texts paired with embeddings; indices are assigned contiguously.
fn arb_chunks(dim: usize) -> impl Strategy<Value = Vec<Chunk>> {
    proptest::collection::vec(("[a-z ]{5,30}", arb_embedding(dim)), 1..20).prop_map(|pairs| {
        pairs
            .into_iter()
            .enumerate()
            .map(|(index, (text, embedding))| Chunk::new(index, text, embedding))
            .collect()
    })
}

fn document(title: &str) -> Document {
    Document { title: title.to_string(), ..Document::default() }
}

/// Every hit is within the threshold, hits ascend by distance, and the
/// result size never exceeds the limit.
mod prop_inmemory_search {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_within_threshold_ascending_and_bounded(
            chunks in arb_chunks(DIM),
            query in arb_embedding(DIM),
            limit in 0usize..25,
            max_distance in 0.0f32..3.0f32,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, expected) = rt.block_on(async {
                let store = InMemoryDocumentStore::new();
                store.insert_document_with_chunks(&document("doc"), &chunks).await.unwrap();
                let results = store.search_chunks(&query, limit, max_distance).await.unwrap();
                let within = chunks
                    .iter()
                    .filter(|c| l2_distance(&c.embedding, &query) <= max_distance)
                    .count();
                (results, within.min(limit))
            });

            prop_assert_eq!(results.len(), expected);
            for hit in &results {
                let distance = hit.distance.expect("search results carry a distance");
                prop_assert!(distance <= max_distance);
            }
            for pair in results.windows(2) {
                prop_assert!(pair[0].distance.unwrap() <= pair[1].distance.unwrap());
            }
        }
    }
}

#[tokio::test]
async fn insert_assigns_ids_and_links_chunks() {
    let store = InMemoryDocumentStore::new();
    let chunks = vec![Chunk::new(0, "a", vec![0.0, 1.0]), Chunk::new(1, "b", vec![1.0, 0.0])];

    let first = store.insert_document_with_chunks(&document("one"), &chunks).await.unwrap();
    let second = store.insert_document_with_chunks(&document("two"), &chunks).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(store.document_count().await, 2);
    assert_eq!(store.chunk_count().await, 4);
    assert_eq!(store.document(first).await.unwrap().title, "one");

    let hits = store.search_chunks(&[0.0, 1.0], 10, 0.0).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|c| c.text == "a" && c.document_id.is_some()));
}

#[tokio::test]
async fn rejected_insert_leaves_store_untouched() {
    let store = InMemoryDocumentStore::new();
    let gapped = vec![Chunk::new(0, "a", vec![0.0, 1.0]), Chunk::new(2, "b", vec![1.0, 0.0])];
    assert!(store.insert_document_with_chunks(&document("bad"), &gapped).await.is_err());

    let mixed = vec![Chunk::new(0, "a", vec![0.0, 1.0]), Chunk::new(1, "b", vec![1.0])];
    assert!(store.insert_document_with_chunks(&document("bad"), &mixed).await.is_err());

    assert_eq!(store.document_count().await, 0);
    assert_eq!(store.chunk_count().await, 0);
}

#[tokio::test]
async fn zero_limit_returns_nothing() {
    let store = InMemoryDocumentStore::new();
    let chunks = vec![Chunk::new(0, "a", vec![0.0])];
    store.insert_document_with_chunks(&document("d"), &chunks).await.unwrap();
    assert!(store.search_chunks(&[0.0], 0, 1.0).await.unwrap().is_empty());
}
