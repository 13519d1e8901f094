//! Dense embedder HTTP adapters (spec §6: "Dense embedder: an external
//! service the core calls"). Shaped like `codegraph-storage`'s
//! `QdrantHttpStore`: a thin `reqwest`-based client behind the `DenseEmbedder`
//! port, one struct per provider selected by `Config::embedding_provider`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;

use super::{DenseEmbedder, EmbeddingResult};
use crate::shared::models::Result;

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    vector_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            vector_size: 1536,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, vector_size: usize) -> Self {
        self.model = model.into();
        self.vector_size = vector_size;
        self
    }
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbeddingData>,
    usage: OpenAiUsage,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    total_tokens: usize,
}

#[async_trait]
impl DenseEmbedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": self.model, "input": texts }))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(err) => {
                let message = err.to_string();
                return Ok(texts
                    .iter()
                    .map(|_| EmbeddingResult::failed(&self.model, &message))
                    .collect());
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let message = format!("openai embeddings request failed: {status}");
            return Ok(texts
                .iter()
                .map(|_| EmbeddingResult::failed(&self.model, &message))
                .collect());
        }

        let parsed: OpenAiResponse = match response.json().await {
            Ok(p) => p,
            Err(err) => {
                let message = err.to_string();
                return Ok(texts
                    .iter()
                    .map(|_| EmbeddingResult::failed(&self.model, &message))
                    .collect());
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let per_item_tokens = parsed.usage.total_tokens / texts.len().max(1);
        let cost_per_token = 0.02 / 1_000_000.0;

        Ok(parsed
            .data
            .into_iter()
            .map(|d| EmbeddingResult {
                vector: d.embedding,
                model: self.model.clone(),
                token_count: per_item_tokens,
                processing_time_ms: elapsed_ms,
                cost_estimate: per_item_tokens as f64 * cost_per_token,
                error: None,
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn vector_size(&self) -> usize {
        self.vector_size
    }
}

pub struct VoyageEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    vector_size: usize,
}

impl VoyageEmbedder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "voyage-code-3".to_string(),
            vector_size: 1024,
        }
    }
}

#[derive(Deserialize)]
struct VoyageResponse {
    data: Vec<VoyageEmbeddingData>,
    usage: VoyageUsage,
}

#[derive(Deserialize)]
struct VoyageEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct VoyageUsage {
    total_tokens: usize,
}

#[async_trait]
impl DenseEmbedder for VoyageEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let response = self
            .client
            .post("https://api.voyageai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": self.model, "input": texts }))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(err) => {
                let message = err.to_string();
                return Ok(texts
                    .iter()
                    .map(|_| EmbeddingResult::failed(&self.model, &message))
                    .collect());
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let message = format!("voyage embeddings request failed: {status}");
            return Ok(texts
                .iter()
                .map(|_| EmbeddingResult::failed(&self.model, &message))
                .collect());
        }

        let parsed: VoyageResponse = match response.json().await {
            Ok(p) => p,
            Err(err) => {
                let message = err.to_string();
                return Ok(texts
                    .iter()
                    .map(|_| EmbeddingResult::failed(&self.model, &message))
                    .collect());
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let per_item_tokens = parsed.usage.total_tokens / texts.len().max(1);
        let cost_per_token = 0.12 / 1_000_000.0;

        Ok(parsed
            .data
            .into_iter()
            .map(|d| EmbeddingResult {
                vector: d.embedding,
                model: self.model.clone(),
                token_count: per_item_tokens,
                processing_time_ms: elapsed_ms,
                cost_estimate: per_item_tokens as f64 * cost_per_token,
                error: None,
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn vector_size(&self) -> usize {
        self.vector_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_embedder_defaults() {
        let embedder = OpenAiEmbedder::new("test-key");
        assert_eq!(embedder.model_name(), "text-embedding-3-small");
        assert_eq!(embedder.vector_size(), 1536);
    }

    #[test]
    fn test_voyage_embedder_defaults() {
        let embedder = VoyageEmbedder::new("test-key");
        assert_eq!(embedder.model_name(), "voyage-code-3");
        assert_eq!(embedder.vector_size(), 1024);
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let embedder = OpenAiEmbedder::new("test-key");
        let results = embedder.embed_batch(&[]).await.unwrap();
        assert!(results.is_empty());
    }
}
