//! HTTP `VectorStore` adapter shaped like the Qdrant REST API.
//!
//! Constants (`max_batch_size=1000`, `max_retries=3`, backoff `2^attempt`
//! seconds) are carried verbatim from `claude_indexer/storage/qdrant.py`
//! (see `UpsertConfig::default`). Built with `reqwest`, following the
//! teacher's choice of an async HTTP client wherever it talks to an
//! external service (`codegraph-ir`'s embedding adapters use the same
//! crate).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::domain::point::{Distance, Point, PointFilter, ScoredPoint, ScrollPage, SparseVector};
use crate::domain::ports::{scroll_all, IdCollision, UpsertConfig, UpsertReport, VectorStore};
use crate::error::StorageError;
use crate::Result;

/// HTTP adapter for a Qdrant-compatible vector store.
pub struct QdrantHttpStore {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl QdrantHttpStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }
        req
    }

    async fn backoff_sleep(attempt: u32, max_backoff_secs: u64) {
        let secs = 2u64.saturating_pow(attempt).min(max_backoff_secs);
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}

#[derive(Serialize)]
struct CreateCollectionBody {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

fn distance_str(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "Cosine",
        Distance::Euclid => "Euclid",
        Distance::Dot => "Dot",
    }
}

#[derive(Serialize)]
struct WirePoint {
    id: u64,
    vector: WireVector,
    payload: serde_json::Value,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireVector {
    Dense(Vec<f32>),
    Named(serde_json::Value),
}

fn to_wire_point(p: &Point) -> WirePoint {
    let vector = match (&p.dense_vector, &p.sparse_vector) {
        (Some(dense), Some(sparse)) => WireVector::Named(json!({
            "dense": dense,
            "sparse": sparse_to_json(sparse),
        })),
        (Some(dense), None) => WireVector::Dense(dense.clone()),
        (None, Some(sparse)) => WireVector::Named(json!({ "sparse": sparse_to_json(sparse) })),
        (None, None) => WireVector::Dense(Vec::new()),
    };
    WirePoint {
        id: p.id,
        vector,
        payload: p.payload.clone(),
    }
}

fn sparse_to_json(sparse: &SparseVector) -> serde_json::Value {
    json!({ "indices": sparse.indices, "values": sparse.values })
}

#[derive(Deserialize)]
struct CountResponse {
    result: CountResult,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: u64,
    score: f32,
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrollHit>,
    next_page_offset: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ScrollHit {
    id: u64,
    payload: serde_json::Value,
    #[serde(default)]
    vector: Option<serde_json::Value>,
}

fn filter_to_qdrant(filter: &PointFilter) -> serde_json::Value {
    let must: Vec<serde_json::Value> = filter
        .conditions
        .iter()
        .map(|c| match c {
            crate::domain::point::FieldCondition::Equals { key, value } => {
                json!({ "key": key, "match": { "value": value } })
            }
            crate::domain::point::FieldCondition::Exists { key } => {
                json!({ "key": key, "match": { "except": [] }, "is_empty": false })
            }
        })
        .collect();
    json!({ "must": must })
}

#[async_trait]
impl VectorStore for QdrantHttpStore {
    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<()> {
        let body = CreateCollectionBody {
            vectors: VectorParams {
                size: vector_size,
                distance: distance_str(distance),
            },
        };
        self.request(reqwest::Method::PUT, &format!("/collections/{name}"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/collections/{name}"))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    async fn upsert_points(
        &self,
        name: &str,
        points: Vec<Point>,
        config: UpsertConfig,
    ) -> Result<UpsertReport> {
        let attempted = points.len();

        let mut by_id: std::collections::HashMap<u64, Vec<&Point>> =
            std::collections::HashMap::new();
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

        for batch in points.chunks(config.max_batch_size) {
            let wire_points: Vec<WirePoint> = batch.iter().map(to_wire_point).collect();
            let mut attempt = 0u32;
            loop {
                let resp = self
                    .request(
                        reqwest::Method::PUT,
                        &format!("/collections/{name}/points?wait=true"),
                    )
                    .json(&json!({ "points": wire_points }))
                    .send()
                    .await
                    .map_err(StorageError::from)
                    .and_then(|r| r.error_for_status().map_err(StorageError::from));

                match resp {
                    Ok(_) => break,
                    Err(err) if err.is_transient() && attempt < config.max_retries => {
                        attempt += 1;
                        warn!(
                            collection = name,
                            attempt, "upsert sub-batch transient failure, retrying"
                        );
                        Self::backoff_sleep(attempt, config.max_backoff_secs).await;
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        let written = self.count(name).await?;
        info!(collection = name, attempted, written, "upsert_points complete");

        Ok(UpsertReport {
            attempted,
            written: written as usize,
            collisions,
        })
    }

    async fn delete_points(&self, name: &str, ids: &[u64]) -> Result<()> {
        self.request(
            reqwest::Method::POST,
            &format!("/collections/{name}/points/delete?wait=true"),
        )
        .json(&json!({ "points": ids }))
        .send()
        .await?
        .error_for_status()?;
        Ok(())
    }

    async fn delete_by_filter(&self, name: &str, filter: &PointFilter) -> Result<u64> {
        let before = self.count(name).await.unwrap_or(0);
        self.request(
            reqwest::Method::POST,
            &format!("/collections/{name}/points/delete?wait=true"),
        )
        .json(&json!({ "filter": filter_to_qdrant(filter) }))
        .send()
        .await?
        .error_for_status()?;
        let after = self.count(name).await.unwrap_or(before);
        Ok(before.saturating_sub(after))
    }

    async fn search_similar(
        &self,
        name: &str,
        query_vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
        filter: Option<&PointFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let mut body = json!({
            "vector": query_vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(threshold) = score_threshold {
            body["score_threshold"] = json!(threshold);
        }
        if let Some(f) = filter {
            body["filter"] = filter_to_qdrant(f);
        }

        let resp: SearchResponse = self
            .request(reqwest::Method::POST, &format!("/collections/{name}/points/search"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }

    async fn scroll(
        &self,
        name: &str,
        filter: Option<&PointFilter>,
        with_vectors: bool,
        offset: Option<&str>,
        limit: usize,
    ) -> Result<ScrollPage> {
        let mut body = json!({
            "limit": limit,
            "with_payload": true,
            "with_vector": with_vectors,
        });
        if let Some(f) = filter {
            body["filter"] = filter_to_qdrant(f);
        }
        if let Some(token) = offset {
            body["offset"] = json!(token.parse::<u64>().unwrap_or(0));
        }

        let resp: ScrollResponse = self
            .request(reqwest::Method::POST, &format!("/collections/{name}/points/scroll"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let points = resp
            .result
            .points
            .into_iter()
            .map(|hit| Point {
                id: hit.id,
                id_string: String::new(),
                dense_vector: None,
                sparse_vector: None,
                payload: hit.payload,
            })
            .collect();

        let next_offset = resp
            .result
            .next_page_offset
            .and_then(|v| v.as_u64())
            .map(|n| n.to_string());

        Ok(ScrollPage { points, next_offset })
    }

    async fn count(&self, name: &str) -> Result<u64> {
        let resp: CountResponse = self
            .request(reqwest::Method::POST, &format!("/collections/{name}/points/count"))
            .json(&json!({ "exact": true }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.result.count)
    }

    async fn clear_collection(&self, name: &str, preserve_manual: bool) -> Result<()> {
        if !preserve_manual {
            return self.delete_collection(name).await;
        }

        let auto_entities = PointFilter::new().with(crate::domain::point::FieldCondition::Exists {
            key: "file_path".into(),
        });
        self.delete_by_filter(name, &auto_entities).await?;

        let auto_relations = PointFilter::new()
            .with(crate::domain::point::FieldCondition::Exists { key: "entity_name".into() })
            .with(crate::domain::point::FieldCondition::Exists {
                key: "relation_target".into(),
            })
            .with(crate::domain::point::FieldCondition::Exists {
                key: "relation_type".into(),
            });
        self.delete_by_filter(name, &auto_relations).await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.request(reqwest::Method::DELETE, &format!("/collections/{name}"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Sweep every page of a collection; used by `codegraph-ir`'s global
/// entity-name cache and orphan-cleanup pass (§4.6, §4.9) against either
/// adapter via the shared `scroll_all` helper.
pub async fn scroll_all_entities(store: &QdrantHttpStore, name: &str) -> Result<Vec<Point>> {
    scroll_all(store, name, None, false, 1000, 10_000).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_str() {
        assert_eq!(distance_str(Distance::Cosine), "Cosine");
        assert_eq!(distance_str(Distance::Euclid), "Euclid");
        assert_eq!(distance_str(Distance::Dot), "Dot");
    }

    #[test]
    fn test_filter_to_qdrant_equals() {
        let filter = PointFilter::new().with(crate::domain::point::FieldCondition::Equals {
            key: "file_path".into(),
            value: "a.py".into(),
        });
        let json = filter_to_qdrant(&filter);
        assert_eq!(json["must"][0]["key"], "file_path");
    }

    #[test]
    fn test_to_wire_point_dense_only() {
        let p = Point::new("x", json!({})).with_dense(vec![1.0, 2.0]);
        let wire = to_wire_point(&p);
        assert_eq!(wire.id, p.id);
    }
}
