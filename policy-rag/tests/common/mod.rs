//! Deterministic test doubles for the gateway and store traits.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use policy_rag::{
    Chunk, Document, DocumentId, DocumentStore, EmbeddingProvider, GenerationProvider,
    PolicyError, Result,
};

/// Embeds known texts to fixed vectors and everything else to a default.
pub struct MapEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl MapEmbedder {
    pub fn new(default: Vec<f32>) -> Self {
        Self { vectors: HashMap::new(), default, calls: AtomicUsize::new(0), fail_on_call: None }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Fail the `n`-th call (1-based) with a gateway error.
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MapEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(PolicyError::gateway("Stub", format!("embedding call {call} failed")));
        }
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| self.default.clone()))
    }
}

/// Returns a scripted response (or error) and records every prompt pair.
pub struct ScriptedGenerator {
    response: std::result::Result<String, String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn replying(response: &str) -> Self {
        Self { response: Ok(response.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn failing(message: &str) -> Self {
        Self { response: Err(message.to_string()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompts(&self) -> Option<(String, String)> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push((system_prompt.to_string(), user_prompt.to_string()));
        self.response.clone().map_err(|message| PolicyError::gateway("Stub", message))
    }
}

/// A store whose searches fail for chosen thresholds and are counted.
pub struct FlakyStore {
    chunks: Vec<Chunk>,
    failing_thresholds: Vec<f32>,
    searches: Mutex<Vec<f32>>,
}

impl FlakyStore {
    /// `chunks` must carry their `distance` to whatever query is used.
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks, failing_thresholds: Vec::new(), searches: Mutex::new(Vec::new()) }
    }

    pub fn failing_at(mut self, threshold: f32) -> Self {
        self.failing_thresholds.push(threshold);
        self
    }

    pub fn searched_thresholds(&self) -> Vec<f32> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn insert_document_with_chunks(
        &self,
        _document: &Document,
        _chunks: &[Chunk],
    ) -> Result<DocumentId> {
        Err(PolicyError::store("Flaky", "read-only"))
    }

    async fn search_chunks(
        &self,
        _embedding: &[f32],
        limit: usize,
        max_distance: f32,
    ) -> Result<Vec<Chunk>> {
        self.searches.lock().unwrap().push(max_distance);
        if self.failing_thresholds.contains(&max_distance) {
            return Err(PolicyError::store("Flaky", "connection reset"));
        }
        let mut hits: Vec<Chunk> = self
            .chunks
            .iter()
            .filter(|c| c.distance.is_some_and(|d| d <= max_distance))
            .cloned()
            .collect();
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Build a retrieval hit with a preset distance.
pub fn hit(index: usize, text: &str, distance: f32) -> Chunk {
    let mut chunk = Chunk::new(index, text, vec![]);
    chunk.distance = Some(distance);
    chunk
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
