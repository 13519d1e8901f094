//! Dense + BM25 sparse embedder abstraction (spec §4.3).

pub mod bm25;
pub mod caching;
pub mod providers;
pub mod retry;

use async_trait::async_trait;

use crate::shared::models::Result;

/// Result of embedding a single text (spec §4.3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingResult {
    pub vector: Vec<f32>,
    pub model: String,
    pub token_count: usize,
    pub processing_time_ms: u64,
    pub cost_estimate: f64,
    /// Per-item failure; callers skip this item at point-build rather than
    /// treating the whole batch as failed (§4.3, §7).
    pub error: Option<String>,
}

impl EmbeddingResult {
    pub fn failed(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Capability trait for a dense embedder (spec §4.3: "Batch API:
/// `embed_batch(texts) -> [EmbeddingResult]`, order preserved, partial
/// failures allowed").
#[async_trait]
pub trait DenseEmbedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>>;

    fn model_name(&self) -> &str;

    fn vector_size(&self) -> usize;
}

/// Capability trait for the BM25 sparse embedder. Kept distinct from
/// `DenseEmbedder` rather than a single embedder with an `hasattr`-style
/// capability check (§9: replace duck-typed capability checks with explicit
/// traits — `SupportsHybrid` here is simply "implements both traits").
#[async_trait]
pub trait SparseEmbedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<codegraph_storage::SparseVector>>;

    fn vocab_size(&self) -> usize;
}
