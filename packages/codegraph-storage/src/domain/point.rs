//! Point/payload domain model for the vector store (spec §3, §4.4.1, §6).
//!
//! A `Point` is the physical unit the store persists: a 64-bit point ID, an
//! optional dense vector, an optional sparse vector, and a JSON payload
//! carrying the chunk's typed fields (`type`, `chunk_type`, `entity_name`,
//! `content_hash`, ...). The payload is kept as `serde_json::Value` rather
//! than a closed struct because relation/metadata/implementation chunks each
//! contribute a different subset of optional fields (§4.4.1) and the store
//! itself never interprets them beyond the few keys `clear_collection`'s
//! `preserve_manual` pass needs (§4.4, scenario 6).

use sha2::{Digest, Sha256};

/// 64-bit point ID: first 16 hex chars of SHA-256(id-string), parsed as hex.
///
/// Grounded in spec.md §6 ("Point ID: 64-bit integer = first 16 hex chars of
/// SHA-256(id-string), parsed as hex") and §8's invariant
/// `point_id(p) == sha256_i64(id_string(p))`.
pub fn point_id(id_string: &str) -> u64 {
    let digest = Sha256::digest(id_string.as_bytes());
    let hex = hex_prefix(&digest, 16);
    u64::from_str_radix(&hex, 16).expect("16 hex chars always fit in u64")
}

fn hex_prefix(bytes: &[u8], hex_len: usize) -> String {
    let mut s = String::with_capacity(hex_len);
    for byte in bytes {
        if s.len() >= hex_len {
            break;
        }
        s.push_str(&format!("{:02x}", byte));
    }
    s.truncate(hex_len);
    s
}

/// Similarity metric a collection is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
}

/// A variable-length sparse vector (BM25-style), indices into a shared
/// vocabulary plus their weights. Parallel arrays, same length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Self {
        debug_assert_eq!(indices.len(), values.len());
        Self { indices, values }
    }
}

/// A point to be written to the store.
///
/// `id_string` is the canonical id (e.g. an `EntityChunk`/`RelationChunk`
/// id) the point ID is derived from; it is carried alongside `id` so
/// diagnostics (duplicate-ID reporting, §4.4.2) can name the offending
/// source string rather than just the opaque integer.
#[derive(Debug, Clone)]
pub struct Point {
    pub id: u64,
    pub id_string: String,
    pub dense_vector: Option<Vec<f32>>,
    pub sparse_vector: Option<SparseVector>,
    pub payload: serde_json::Value,
}

impl Point {
    pub fn new(id_string: impl Into<String>, payload: serde_json::Value) -> Self {
        let id_string = id_string.into();
        let id = point_id(&id_string);
        Self {
            id,
            id_string,
            dense_vector: None,
            sparse_vector: None,
            payload,
        }
    }

    pub fn with_dense(mut self, vector: Vec<f32>) -> Self {
        self.dense_vector = Some(vector);
        self
    }

    pub fn with_sparse(mut self, vector: SparseVector) -> Self {
        self.sparse_vector = Some(vector);
        self
    }

    fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    /// True if this point is an "auto-entity": payload carries `file_path`.
    /// Used by `clear_collection(preserve_manual=true)` (§4.4, scenario 6).
    pub fn is_auto_entity(&self) -> bool {
        self.payload.get("file_path").is_some()
    }

    /// True if this point is an "auto-relation": payload carries the full
    /// `(entity_name, relation_target, relation_type)` triple.
    pub fn is_auto_relation(&self) -> bool {
        self.payload_str("entity_name").is_some()
            && self.payload_str("relation_target").is_some()
            && self.payload_str("relation_type").is_some()
    }
}

/// One hit from `search_similar`.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
    pub payload: serde_json::Value,
}

/// One page from `scroll`.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub points: Vec<Point>,
    /// Opaque continuation token; `None` once the collection is exhausted.
    pub next_offset: Option<String>,
}

/// Filter applied to `search_similar`/`scroll`/`delete_points`-by-filter.
///
/// Modeled as an explicit struct of optional exact-match conditions rather
/// than a generic query-expression tree: every filter this system issues
/// (§4.6 module resolution, §4.9 orphan sweep, §4.4 clear_collection) is a
/// conjunction of equality/existence checks against payload keys.
#[derive(Debug, Clone, Default)]
pub struct PointFilter {
    pub conditions: Vec<FieldCondition>,
}

impl PointFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: FieldCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn matches(&self, payload: &serde_json::Value) -> bool {
        self.conditions.iter().all(|c| c.matches(payload))
    }
}

#[derive(Debug, Clone)]
pub enum FieldCondition {
    /// Payload key equals the given string value.
    Equals { key: String, value: String },
    /// Payload key exists (any value).
    Exists { key: String },
}

impl FieldCondition {
    fn matches(&self, payload: &serde_json::Value) -> bool {
        match self {
            FieldCondition::Equals { key, value } => {
                payload.get(key).and_then(|v| v.as_str()) == Some(value.as_str())
            }
            FieldCondition::Exists { key } => payload.get(key).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_matches_sha256_prefix() {
        let id_string = "src/auth.py::function::login::metadata";
        let expected_hex = {
            let digest = Sha256::digest(id_string.as_bytes());
            format!("{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
                digest[0], digest[1], digest[2], digest[3],
                digest[4], digest[5], digest[6], digest[7])
        };
        let expected = u64::from_str_radix(&expected_hex, 16).unwrap();
        assert_eq!(point_id(id_string), expected);
    }

    #[test]
    fn test_point_id_deterministic() {
        assert_eq!(point_id("same-string"), point_id("same-string"));
        assert_ne!(point_id("a"), point_id("b"));
    }

    #[test]
    fn test_is_auto_entity() {
        let p = Point::new("x", serde_json::json!({"file_path": "a.py"}));
        assert!(p.is_auto_entity());

        let p2 = Point::new("y", serde_json::json!({"entity_name": "Foo"}));
        assert!(!p2.is_auto_entity());
    }

    #[test]
    fn test_is_auto_relation() {
        let p = Point::new(
            "x",
            serde_json::json!({
                "entity_name": "Foo",
                "relation_target": "Base",
                "relation_type": "inherits",
            }),
        );
        assert!(p.is_auto_relation());

        let p2 = Point::new("y", serde_json::json!({"entity_name": "Foo"}));
        assert!(!p2.is_auto_relation());
    }

    #[test]
    fn test_point_filter_equals() {
        let filter = PointFilter::new().with(FieldCondition::Equals {
            key: "file_path".into(),
            value: "a.py".into(),
        });
        assert!(filter.matches(&serde_json::json!({"file_path": "a.py"})));
        assert!(!filter.matches(&serde_json::json!({"file_path": "b.py"})));
    }

    #[test]
    fn test_point_filter_exists() {
        let filter = PointFilter::new().with(FieldCondition::Exists {
            key: "relation_target".into(),
        });
        assert!(filter.matches(&serde_json::json!({"relation_target": "Base"})));
        assert!(!filter.matches(&serde_json::json!({"entity_name": "Foo"})));
    }
}
