use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Embedding provider. Dimension is fixed at process start; documents and
/// queries must go through the same implementation.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
}

/// Embedding client for an Ollama-style HTTP endpoint.
#[derive(Clone)]
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(base_url: String, model: String, dimension: usize) -> Self {
        Self {
            base_url,
            model,
            dimension,
            client: reqwest::Client::new(),
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            anyhow::bail!("Embedding request failed: {}", response.status());
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        if body.embedding.len() != self.dimension {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                body.embedding.len()
            );
        }
        Ok(body.embedding)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    /// Failure here is surfaced, not swallowed: without embeddings the
    /// store can do nothing useful.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text).await?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
