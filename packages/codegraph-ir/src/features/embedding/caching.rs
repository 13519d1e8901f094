//! Caching decorator (spec §4.3: "identical text yields identical cached
//! vectors").
//!
//! Modeled as a composable wrapper delegating through the `DenseEmbedder`
//! trait rather than monkey-patching the inner embedder (§9: "Decorator-based
//! caching/retry embedders... implement caching and retry as composable
//! wrappers that delegate through a trait/interface").

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{DenseEmbedder, EmbeddingResult};
use crate::shared::models::Result;

pub struct CachingEmbedder<E: DenseEmbedder> {
    inner: E,
    cache: DashMap<String, EmbeddingResult>,
}

impl<E: DenseEmbedder> CachingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<E: DenseEmbedder> DenseEmbedder for CachingEmbedder<E> {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        let mut results: Vec<Option<EmbeddingResult>> = vec![None; texts.len()];
        let mut misses: Vec<(usize, String)> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            if let Some(cached) = self.cache.get(text) {
                results[i] = Some(cached.clone());
            } else {
                misses.push((i, text.clone()));
            }
        }

        if !misses.is_empty() {
            let miss_texts: Vec<String> = misses.iter().map(|(_, t)| t.clone()).collect();
            let fresh = self.inner.embed_batch(&miss_texts).await?;

            for ((i, text), result) in misses.into_iter().zip(fresh.into_iter()) {
                if result.is_ok() {
                    self.cache.insert(text, result.clone());
                }
                results[i] = Some(result);
            }
        }

        Ok(results.into_iter().map(|r| r.unwrap_or_default()).collect())
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn vector_size(&self) -> usize {
        self.inner.vector_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DenseEmbedder for CountingEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| EmbeddingResult {
                    vector: vec![t.len() as f32],
                    model: "test".to_string(),
                    ..Default::default()
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "test"
        }

        fn vector_size(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_identical_text_uses_cache() {
        let embedder = CachingEmbedder::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });

        let r1 = embedder
            .embed_batch(&["hello".to_string()])
            .await
            .unwrap();
        let r2 = embedder
            .embed_batch(&["hello".to_string()])
            .await
            .unwrap();

        assert_eq!(r1[0].vector, r2[0].vector);
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mixed_hit_and_miss() {
        let embedder = CachingEmbedder::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });

        embedder.embed_batch(&["a".to_string()]).await.unwrap();
        let results = embedder
            .embed_batch(&["a".to_string(), "bb".to_string()])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 2);
    }
}
