//! Retry decorator (spec §4.3: "retries are transient-only (timeouts, 5xx);
//! final failure surfaces as an error on the result, never an exception
//! bubbling past the embedder boundary").

use async_trait::async_trait;
use std::time::Duration;

use super::{DenseEmbedder, EmbeddingResult};
use crate::shared::models::Result;

/// Classifies an error message as transient (worth retrying) vs. permanent.
/// Mirrors the store's `is_transient` split (timeouts/5xx) rather than a
/// generic "retry everything" policy.
fn is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection reset")
        || lower.contains("rate limit")
        || ["500", "502", "503", "504"]
            .iter()
            .any(|code| lower.contains(code))
}

pub struct RetryEmbedder<E: DenseEmbedder> {
    inner: E,
    max_retries: u32,
    base_backoff: Duration,
}

impl<E: DenseEmbedder> RetryEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[async_trait]
impl<E: DenseEmbedder> DenseEmbedder for RetryEmbedder<E> {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
        let mut results = self.inner.embed_batch(texts).await?;

        for (i, result) in results.iter_mut().enumerate() {
            let mut attempt = 0;
            while let Some(error) = result.error.clone() {
                if attempt >= self.max_retries || !is_transient(&error) {
                    break;
                }
                attempt += 1;
                tokio::time::sleep(self.base_backoff * attempt).await;

                tracing::warn!(attempt, text_index = i, %error, "retrying transient embedding failure");
                let retried = self.inner.embed_batch(std::slice::from_ref(&texts[i])).await?;
                if let Some(first) = retried.into_iter().next() {
                    *result = first;
                }
            }
        }

        Ok(results)
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

    struct FlakyEmbedder {
        calls: AtomicUsize,
        fail_until: usize,
    }

    #[async_trait]
    impl DenseEmbedder for FlakyEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingResult>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|_| {
                    if call < self.fail_until {
                        EmbeddingResult::failed("test", "request timeout")
                    } else {
                        EmbeddingResult {
                            vector: vec![1.0],
                            model: "test".to_string(),
                            ..Default::default()
                        }
                    }
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
    async fn test_retries_transient_error_until_success() {
        let embedder = RetryEmbedder::new(FlakyEmbedder {
            calls: AtomicUsize::new(0),
            fail_until: 2,
        });

        let results = embedder.embed_batch(&["x".to_string()]).await.unwrap();
        assert!(results[0].is_ok());
    }

    #[test]
    fn test_is_transient_classification() {
        assert!(is_transient("request timeout"));
        assert!(is_transient("HTTP 503 Service Unavailable"));
        assert!(!is_transient("invalid api key"));
        assert!(!is_transient("400 bad request"));
    }
}
