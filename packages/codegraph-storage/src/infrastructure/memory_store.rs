//! In-memory `VectorStore` reference adapter.
//!
//! Grounded in the teacher's in-memory test doubles for `CodeSnapshotStore`
//! (`codegraph-storage/src/domain/mod.rs` tests construct fixtures directly
//! rather than hitting a real database) generalized into a full adapter:
//! this is the default backend for unit/integration tests and local
//! development, since it needs no external Qdrant instance.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::domain::point::{Distance, Point, PointFilter, ScoredPoint, ScrollPage};
use crate::domain::ports::{IdCollision, UpsertConfig, UpsertReport, VectorStore};
use crate::Result;

#[allow(dead_code)]
struct Collection {
    vector_size: usize,
    distance: Distance,
    points: HashMap<u64, Point>,
}

/// In-memory point store, keyed by collection name.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<()> {
        let mut collections = self.collections.write();
        collections.entry(name.to_string()).or_insert_with(|| Collection {
            vector_size,
            distance,
            points: HashMap::new(),
        });
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn upsert_points(
        &self,
        name: &str,
        points: Vec<Point>,
        _config: UpsertConfig,
    ) -> Result<UpsertReport> {
        let attempted = points.len();

        // §4.4.2: duplicate point IDs within the batch are reported and
        // still sent; the store treats repeated IDs as idempotent (last
        // write wins, since they are identical for deterministic ids).
        let mut by_id: HashMap<u64, Vec<&Point>> = HashMap::new();
        for p in &points {
            by_id.entry(p.id).or_default().push(p);
        }
        let collisions: Vec<IdCollision> = by_id
            .iter()
            .filter(|(_, v)| v.len() > 1)
            .map(|(id, v)| IdCollision {
                point_id: *id,
                count: v.len(),
                sample_id_strings: v.iter().take(3).map(|p| p.id_string.clone()).collect(),
            })
            .collect();

        if !collisions.is_empty() {
            warn!(
                collection = name,
                collisions = collisions.len(),
                "upsert_points: duplicate point IDs within batch"
            );
        }

        let mut collections = self.collections.write();
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                vector_size: points
                    .iter()
                    .find_map(|p| p.dense_vector.as_ref().map(|v| v.len()))
                    .unwrap_or(0),
                distance: Distance::Cosine,
                points: HashMap::new(),
            });

        for point in points {
            collection.points.insert(point.id, point);
        }

        let written = collection.points.len().min(attempted).max(
            attempted - collisions.iter().map(|c| c.count - 1).sum::<usize>(),
        );

        Ok(UpsertReport {
            attempted,
            written,
            collisions,
        })
    }

    async fn delete_points(&self, name: &str, ids: &[u64]) -> Result<()> {
        if let Some(collection) = self.collections.write().get_mut(name) {
            for id in ids {
                collection.points.remove(id);
            }
        }
        Ok(())
    }

    async fn delete_by_filter(&self, name: &str, filter: &PointFilter) -> Result<u64> {
        let mut collections = self.collections.write();
        let Some(collection) = collections.get_mut(name) else {
            return Ok(0);
        };
        let before = collection.points.len();
        collection.points.retain(|_, p| !filter.matches(&p.payload));
        Ok((before - collection.points.len()) as u64)
    }

    async fn search_similar(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&PointFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read();
        let Some(collection) = collections.get(name) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredPoint> = collection
            .points
            .values()
            .filter(|p| filter.map(|f| f.matches(&p.payload)).unwrap_or(true))
            .filter_map(|p| {
                p.dense_vector.as_ref().map(|v| ScoredPoint {
                    id: p.id,
                    score: cosine_similarity(query_vector, v),
                    payload: p.payload.clone(),
                })
            })
            .filter(|sp| score_threshold.map(|t| sp.score >= t).unwrap_or(true))
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn scroll(
        &self,
        name: &str,
        filter: Option<&PointFilter>,
        with_vectors: bool,
        offset: Option<&str>,
        limit: usize,
    ) -> Result<ScrollPage> {
        let collections = self.collections.read();
        let Some(collection) = collections.get(name) else {
            return Ok(ScrollPage::default());
        };

        let mut ids: Vec<u64> = collection.points.keys().copied().collect();
        ids.sort_unstable();

        let start = match offset {
            Some(token) => token
                .parse::<u64>()
                .ok()
                .and_then(|after| ids.iter().position(|id| *id > after))
                .unwrap_or(ids.len()),
            None => 0,
        };

        let page_ids: Vec<u64> = ids
            .iter()
            .skip(start)
            .take(limit)
            .copied()
            .collect();

        let points: Vec<Point> = page_ids
            .iter()
            .filter_map(|id| collection.points.get(id))
            .filter(|p| filter.map(|f| f.matches(&p.payload)).unwrap_or(true))
            .map(|p| {
                let mut cloned = p.clone();
                if !with_vectors {
                    cloned.dense_vector = None;
                    cloned.sparse_vector = None;
                }
                cloned
            })
            .collect();

        let next_offset = page_ids.last().map(|id| id.to_string());
        debug!(collection = name, returned = points.len(), "scroll page");
        Ok(ScrollPage {
            points,
            next_offset,
        })
    }

    async fn count(&self, name: &str) -> Result<u64> {
        Ok(self
            .collections
            .read()
            .get(name)
            .map(|c| c.points.len() as u64)
            .unwrap_or(0))
    }

    async fn clear_collection(&self, name: &str, preserve_manual: bool) -> Result<()> {
        let mut collections = self.collections.write();
        if !preserve_manual {
            collections.remove(name);
            return Ok(());
        }
        if let Some(collection) = collections.get_mut(name) {
            collection
                .points
                .retain(|_, p| !(p.is_auto_entity() || p.is_auto_relation()));
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().remove(name);
        Ok(())
    }
}
