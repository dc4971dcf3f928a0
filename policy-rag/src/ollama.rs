//! Ollama gateways for embedding and text generation.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{PolicyError, Result};
use crate::generation::GenerationProvider;

/// The default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const SERVICE: &str = "Ollama";

/// Connection settings for [`OllamaClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub generate_model: String,
    pub embed_model: String,
    pub timeout: Duration,
}

impl OllamaConfig {
    /// Create a config for the default server address and timeout.
    pub fn new(generate_model: impl Into<String>, embed_model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            generate_model: generate_model.into(),
            embed_model: embed_model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read the config from the environment.
    ///
    /// `OLLAMA_GENERATE_MODEL` and `OLLAMA_EMBED_MODEL` are required;
    /// `OLLAMA_BASE_URL` and `OLLAMA_TIMEOUT_SECS` are optional.
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .map_err(|_| PolicyError::Config(format!("{name} environment variable not set")))
        };
        let mut config =
            Self::new(required("OLLAMA_GENERATE_MODEL")?, required("OLLAMA_EMBED_MODEL")?);
        if let Ok(base_url) = std::env::var("OLLAMA_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        if let Ok(secs) = std::env::var("OLLAMA_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                PolicyError::Config(format!("OLLAMA_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Set the server address.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An [`EmbeddingProvider`] and [`GenerationProvider`] backed by an Ollama server.
///
/// # Example
///
/// ```rust,ignore
/// use policy_rag::ollama::{OllamaClient, OllamaConfig};
///
/// let client = OllamaClient::new(OllamaConfig::new("llama3", "nomic-embed-text"))?;
/// let embedding = client.embed("hello world").await?;
/// ```
pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a client with the given config.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build().map_err(|e| {
            PolicyError::gateway(SERVICE, format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self { client, config })
    }

    /// Create a client from [`OllamaConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await.map_err(|e| {
            error!(provider = SERVICE, path, error = %e, "request failed");
            PolicyError::gateway(SERVICE, format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(provider = SERVICE, path, %status, "API error");
            return Err(PolicyError::gateway(SERVICE, format!("API returned {status}: {detail}")));
        }

        response.json::<R>().await.map_err(|e| {
            error!(provider = SERVICE, path, error = %e, "failed to parse response");
            PolicyError::gateway(SERVICE, format!("failed to parse response: {e}"))
        })
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

// ── Gateway implementations ────────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = SERVICE, text_len = text.len(), model = %self.config.embed_model, "embedding text");
        let body = EmbedRequest { model: &self.config.embed_model, prompt: text };
        let response: EmbedResponse = self.post("/api/embeddings", &body).await?;
        if response.embedding.is_empty() {
            return Err(PolicyError::gateway(SERVICE, "API returned an empty embedding"));
        }
        Ok(response.embedding)
    }
}

#[async_trait]
impl GenerationProvider for OllamaClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        debug!(provider = SERVICE, model = %self.config.generate_model, "generating completion");
        let prompt = format!("{system_prompt}\n\nUser:\n{user_prompt}");
        let body =
            GenerateRequest { model: &self.config.generate_model, prompt: &prompt, stream: false };
        let response: GenerateResponse = self.post("/api/generate", &body).await?;
        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_url_without_double_slash() {
        let client = OllamaClient::new(
            OllamaConfig::new("gen", "emb").with_base_url("http://ollama:11434/"),
        )
        .unwrap();
        assert_eq!(client.url("/api/generate"), "http://ollama:11434/api/generate");
    }

    #[test]
    fn defaults() {
        let config = OllamaConfig::new("gen", "emb");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn request_bodies_match_wire_format() {
        let body = serde_json::to_value(GenerateRequest { model: "m", prompt: "p", stream: false })
            .unwrap();
        assert_eq!(body, serde_json::json!({"model": "m", "prompt": "p", "stream": false}));
        let body = serde_json::to_value(EmbedRequest { model: "m", prompt: "p" }).unwrap();
        assert_eq!(body, serde_json::json!({"model": "m", "prompt": "p"}));
    }
}
