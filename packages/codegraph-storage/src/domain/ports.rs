//! `VectorStore` port (spec §4.4): the Qdrant-shaped abstraction every
//! adapter (in-memory reference, HTTP) implements.
//!
//! Grounded in the teacher's `CodeSnapshotStore` trait
//! (`codegraph-storage/src/domain/mod.rs`): same `async_trait` + `Result<T>`
//! shape, same doc-comment density, same colocated `#[cfg(test)] mod tests`
//! convention — but the operation set and payload model are replaced
//! wholesale to match this spec's point-store contract instead of the
//! teacher's commit/snapshot contract (no `Snapshot`/`replace_file`/
//! `Dependency` here; this store has no notion of commits).

use async_trait::async_trait;

use crate::domain::point::{Distance, Point, PointFilter, ScoredPoint, ScrollPage};
use crate::Result;

/// Tunables for `upsert_points`'s sub-batching/retry behavior (§4.4, §4.4.2).
///
/// Defaults carried verbatim from `claude_indexer/storage/qdrant.py`
/// (`max_batch_size=1000`, `max_retries=3`, backoff `2^attempt` seconds).
#[derive(Debug, Clone, Copy)]
pub struct UpsertConfig {
    pub max_batch_size: usize,
    pub max_retries: u32,
    pub max_backoff_secs: u64,
}

impl Default for UpsertConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_retries: 3,
            max_backoff_secs: 30,
        }
    }
}

/// Diagnostics for an `id_string` that collided with another point in the
/// same `upsert_points` call (§4.4.2: "Duplicate point IDs within a batch
/// are reported (count, top offenders, payload excerpts) and still sent").
#[derive(Debug, Clone)]
pub struct IdCollision {
    pub point_id: u64,
    pub count: usize,
    pub sample_id_strings: Vec<String>,
}

/// Result of a single `upsert_points` call.
#[derive(Debug, Clone, Default)]
pub struct UpsertReport {
    pub attempted: usize,
    pub written: usize,
    pub collisions: Vec<IdCollision>,
}

impl UpsertReport {
    /// §4.4.2: "if fewer points than attempted landed, the discrepancy is
    /// surfaced as a warning (expected when content-hash dedup or
    /// deterministic-id collapse occurs)".
    pub fn has_discrepancy(&self) -> bool {
        self.written < self.attempted
    }
}

/// The Qdrant-shaped vector store abstraction (§4.4).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent at the orchestrator layer: callers are expected to
    /// `collection_exists` first, but adapters may also no-op if the
    /// collection is already present with a compatible vector size.
    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<()>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Splits `points` into sub-batches of `config.max_batch_size`, retrying
    /// each sub-batch on transient (`StorageError::is_transient`) failure
    /// with exponential backoff (`2^attempt` seconds, capped at
    /// `config.max_backoff_secs`), up to `config.max_retries` attempts.
    /// Non-transient errors fail that sub-batch immediately with no retry.
    ///
    /// After the whole call, implementations read back `count(name)` and
    /// populate `UpsertReport::written`; a lower count than `attempted` is
    /// not itself an error (see `UpsertReport::has_discrepancy`).
    async fn upsert_points(
        &self,
        name: &str,
        points: Vec<Point>,
        config: UpsertConfig,
    ) -> Result<UpsertReport>;

    async fn delete_points(&self, name: &str, ids: &[u64]) -> Result<()>;

    /// Delete every point matching `filter`. Used by the orchestrator for
    /// per-file point replacement (§4.6) and orphan sweeps (§4.9), which
    /// address points by payload match rather than by ID.
    async fn delete_by_filter(&self, name: &str, filter: &PointFilter) -> Result<u64>;

    async fn search_similar(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&PointFilter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Pagination helper. Adapters must protect against offset cycles: a
    /// caller looping `scroll` until `next_offset.is_none()` must terminate
    /// even if the backend repeats an offset it already returned (§4.4,
    /// §9 "Pagination via mutable offset tokens").
    async fn scroll(
        &self,
        name: &str,
        filter: Option<&PointFilter>,
        with_vectors: bool,
        offset: Option<&str>,
        limit: usize,
    ) -> Result<ScrollPage>;

    async fn count(&self, name: &str) -> Result<u64>;

    /// When `preserve_manual` is true, deletes only auto-entity points
    /// (payload carries `file_path`) and auto-relation points (payload
    /// carries the full `entity_name`/`relation_target`/`relation_type`
    /// triple); everything else survives. When false, drops the collection
    /// outright (§4.4, §8 scenario 6).
    async fn clear_collection(&self, name: &str, preserve_manual: bool) -> Result<()>;

    async fn delete_collection(&self, name: &str) -> Result<()>;
}

/// Bounded scroll-all helper shared by every `VectorStore` consumer that
/// needs the full collection (global entity-name cache, orphan sweep).
///
/// Not part of the trait itself — a free function over `&dyn VectorStore`
/// so adapters don't each have to reimplement the offset-cycle guard.
pub async fn scroll_all(
    store: &dyn VectorStore,
    name: &str,
    filter: Option<&PointFilter>,
    with_vectors: bool,
    page_size: usize,
    max_pages: usize,
) -> Result<Vec<Point>> {
    let mut seen_offsets = std::collections::HashSet::new();
    let mut all = Vec::new();
    let mut offset: Option<String> = None;

    for _ in 0..max_pages {
        let page = store
            .scroll(name, filter, with_vectors, offset.as_deref(), page_size)
            .await?;
        all.extend(page.points);

        match page.next_offset {
            Some(next) if !seen_offsets.contains(&next) => {
                seen_offsets.insert(next.clone());
                offset = Some(next);
            }
            _ => break,
        }
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_config_defaults() {
        let config = UpsertConfig::default();
        assert_eq!(config.max_batch_size, 1000);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_upsert_report_discrepancy() {
        let report = UpsertReport {
            attempted: 10,
            written: 8,
            collisions: vec![],
        };
        assert!(report.has_discrepancy());

        let clean = UpsertReport {
            attempted: 10,
            written: 10,
            collisions: vec![],
        };
        assert!(!clean.has_discrepancy());
    }
}
