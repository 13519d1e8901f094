//! Content hasher + dedup gate ("Git+Meta", spec §4.2).
//!
//! Before storage, every chunk computes a `content_hash` from its canonical
//! content (`EntityChunk`/`RelationChunk::content_hash`, C1). This module is
//! the single point of cost savings downstream of that hash: it asks the
//! store whether a point with the same `content_hash` already exists
//! anywhere in the collection, skipping embedding and storage when it does.

use codegraph_storage::{FieldCondition, PointFilter, VectorStore};

use crate::shared::models::Result;

/// Queries a collection's existing points by `content_hash` to decide
/// whether a chunk needs re-embedding/re-storage.
pub struct DedupGate<'a> {
    store: &'a dyn VectorStore,
    collection: &'a str,
}

impl<'a> DedupGate<'a> {
    pub fn new(store: &'a dyn VectorStore, collection: &'a str) -> Self {
        Self { store, collection }
    }

    /// True if this content hash is new to the collection (i.e. the chunk
    /// must be embedded and stored); false if an identical point already
    /// exists and the chunk should be skipped (§4.2 rule 1, §8's "for every
    /// file whose content hash is unchanged... no embedding requests are
    /// made" invariant).
    pub async fn needs_processing(&self, content_hash: &str) -> Result<bool> {
        let filter = PointFilter::new().with(FieldCondition::Equals {
            key: "content_hash".to_string(),
            value: content_hash.to_string(),
        });

        let page = self
            .store
            .scroll(self.collection, Some(&filter), false, None, 1)
            .await?;

        Ok(page.points.is_empty())
    }

    /// Bulk variant: filters `hashes` down to the ones not yet present.
    /// Each lookup is independent; callers processing many chunks from the
    /// same batch should prefer this to avoid N serial round trips if the
    /// store adapter benefits from coalescing (the in-memory adapter does
    /// not, but an HTTP adapter backed by Qdrant could batch via `should`
    /// filters in a future revision).
    pub async fn filter_new(&self, hashes: &[String]) -> Result<Vec<bool>> {
        let mut result = Vec::with_capacity(hashes.len());
        for hash in hashes {
            result.push(self.needs_processing(hash).await?);
        }
        Ok(result)
    }
}

/// The orchestrator-level short-circuit (spec §4.2): an entity is treated as
/// unchanged, skipping parse→embed entirely for the file's chunks, when its
/// host file's content hash matches the state-file record for that file.
pub fn file_unchanged(current_hash: &str, recorded_hash: Option<&str>) -> bool {
    recorded_hash == Some(current_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_storage::{Distance, InMemoryVectorStore, Point};

    #[tokio::test]
    async fn test_needs_processing_true_when_absent() {
        let store = InMemoryVectorStore::new();
        store
            .create_collection("proj", 3, Distance::Cosine)
            .await
            .unwrap();
        let gate = DedupGate::new(&store, "proj");

        assert!(gate.needs_processing("deadbeef").await.unwrap());
    }

    #[tokio::test]
    async fn test_needs_processing_false_when_present() {
        let store = InMemoryVectorStore::new();
        store
            .create_collection("proj", 3, Distance::Cosine)
            .await
            .unwrap();

        let point = Point::new(
            "a.py::function::foo::metadata",
            serde_json::json!({"content_hash": "deadbeef"}),
        );
        store
            .upsert_points("proj", vec![point], Default::default())
            .await
            .unwrap();

        let gate = DedupGate::new(&store, "proj");
        assert!(!gate.needs_processing("deadbeef").await.unwrap());
    }

    #[test]
    fn test_file_unchanged() {
        assert!(file_unchanged("abc", Some("abc")));
        assert!(!file_unchanged("abc", Some("def")));
        assert!(!file_unchanged("abc", None));
    }
}
