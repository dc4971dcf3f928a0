//! # Policy QA Example
//!
//! Ingests a small HR handbook, then asks two questions: one answered by a
//! computed formula, one by explanation only.
//!
//! Uses `InMemoryDocumentStore`, a keyword embedding provider and a canned
//! generation provider so it runs with **no model server**. Enable the
//! `ollama` feature and swap in `OllamaClient` to run against real models.
//!
//! Run: `RUST_LOG=policy_rag=debug cargo run --example policy_qa`

use std::sync::Arc;

use async_trait::async_trait;
use policy_rag::{
    AnswerEngine, AskRequest, EmbeddingProvider, GenerationProvider, InMemoryDocumentStore,
    IngestRequest, IngestionPipeline, PolicyConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// KeywordEmbeddingProvider: one dimension per vocabulary word, L2-normalised
// ---------------------------------------------------------------------------

const VOCABULARY: [&str; 6] = ["bonus", "salary", "months", "leave", "days", "overtime"];

struct KeywordEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddingProvider {
    async fn embed(&self, text: &str) -> policy_rag::Result<Vec<f32>> {
        let text = text.to_lowercase();
        let mut emb: Vec<f32> =
            VOCABULARY.iter().map(|word| text.matches(word).count() as f32).collect();
        // Bias dimension keeps vectors non-zero for text outside the vocabulary.
        emb.push(0.1);
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        emb.iter_mut().for_each(|x| *x /= norm);
        Ok(emb)
    }
}

// ---------------------------------------------------------------------------
// CannedGenerationProvider: replies as a well-behaved model would
// ---------------------------------------------------------------------------

struct CannedGenerationProvider;

#[async_trait]
impl GenerationProvider for CannedGenerationProvider {
    async fn generate(&self, _system_prompt: &str, user_prompt: &str) -> policy_rag::Result<String> {
        let reply = if user_prompt.contains("How much bonus") {
            r#"```json
{
  "explanation": "The bonus is 0.1 month of salary for each month worked, capped at 3 months of salary.",
  "formula_expression": "min(monthsWorked * 0.1, 3)",
  "variables": {"monthsWorked": 40, "salary": 15000000},
  "unit": "months_of_salary"
}
```"#
        } else {
            r#"{"explanation": "Employees receive 12 days of paid annual leave, plus one day for every 5 years of service.", "formula_expression": null, "variables": {}, "unit": "days"}"#
        };
        Ok(reply.to_string())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

const HANDBOOK: &str = "\
Annual leave: employees receive 12 days of paid leave per year, plus one additional \
day for every 5 years of service. Unused leave days expire at the end of March.

Year-end bonus: the bonus equals 0.1 months of salary for each month worked, capped at \
3 months of salary. Employees on probation are not eligible for the bonus.

Overtime: overtime hours on weekdays are paid at 150% of the hourly salary.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Keyword vectors are coarse, so the thresholds are looser than the defaults.
    let config = PolicyConfig::builder()
        .chunk_size(200)
        .tight_distance(0.8)
        .loose_distance(1.0)
        .default_max_chunks(2)
        .build()?;

    let embedder = Arc::new(KeywordEmbeddingProvider);
    let store = Arc::new(InMemoryDocumentStore::new());
    let cancel = CancellationToken::new();

    let pipeline = IngestionPipeline::builder()
        .config(config.clone())
        .embedding_provider(embedder.clone())
        .store(store.clone())
        .build()?;

    let request = IngestRequest {
        title: "Employee handbook".to_string(),
        source: "handbook.txt".to_string(),
        mime_type: "text/plain".to_string(),
        language: "en".to_string(),
        tags: vec!["hr".to_string(), "benefits".to_string()],
        content: HANDBOOK.to_string(),
        ..IngestRequest::default()
    };
    let document_id = pipeline.ingest(&request, &cancel).await?;
    println!("Ingested document {document_id} ({} chunks)\n", store.chunk_count().await);

    let engine = AnswerEngine::builder()
        .config(config)
        .embedding_provider(embedder)
        .generation_provider(Arc::new(CannedGenerationProvider))
        .store(store)
        .build()?;

    for question in ["How much bonus do I get after 40 months?", "How many leave days do I have?"]
    {
        let answer = engine.ask(&AskRequest::new(question), &cancel).await?;
        println!("Q: {question}");
        println!("A: {}", answer.text);
        for chunk in &answer.chunks {
            let preview: String = chunk.text.trim().chars().take(60).collect();
            println!("   [{:.3}] {preview}...", chunk.distance.unwrap_or_default());
        }
        println!();
    }

    Ok(())
}
