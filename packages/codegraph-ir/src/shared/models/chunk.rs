//! Chunk model (spec §3 "Chunks", "Canonical IDs and hashing").
//!
//! A `Chunk` is the physical unit actually written to the vector store.
//! Two shapes exist: [`EntityChunk`] (metadata or implementation) and
//! [`RelationChunk`]. Both expose a canonical `id_string`, a `content_hash`
//! (SHA-256 of the canonical content), a 64-bit `point_id` (delegated to
//! `codegraph_storage::point_id`), and a JSON `payload` matching the fields
//! a stored point carries.

use md5::{Digest as Md5Digest, Md5};
use serde_json::{json, Value};
use sha2::{Digest as Sha2Digest, Sha256};

use super::entity::EntityType;
use super::relation::RelationType;

fn sha256_hex(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(digest)
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// The shape of a stored chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Metadata,
    Implementation,
    Relation,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Metadata => "metadata",
            ChunkType::Implementation => "implementation",
            ChunkType::Relation => "relation",
        }
    }
}

/// A chunk describing or carrying the body of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityChunk {
    pub entity_name: String,
    pub entity_type: EntityType,
    pub chunk_type: ChunkType,
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
    pub end_line_number: Option<u32>,
    pub has_implementation: bool,
    pub content: String,
    /// Parser-supplied `semantic_metadata` sub-map (spec §4.1.1: calls,
    /// referenced_attrs, caught_exceptions, cyclomatic_complexity), stored
    /// under the `semantic_metadata` payload key.
    pub metadata: Option<Value>,
}

impl EntityChunk {
    pub fn metadata(entity_name: impl Into<String>, entity_type: EntityType, content: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            entity_type,
            chunk_type: ChunkType::Metadata,
            file_path: None,
            line_number: None,
            end_line_number: None,
            has_implementation: false,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn implementation(entity_name: impl Into<String>, entity_type: EntityType, content: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            entity_type,
            chunk_type: ChunkType::Implementation,
            file_path: None,
            line_number: None,
            end_line_number: None,
            has_implementation: false,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_line_range(mut self, start: u32, end: u32) -> Self {
        self.line_number = Some(start);
        self.end_line_number = Some(end);
        self
    }

    pub fn with_has_implementation(mut self, has_implementation: bool) -> Self {
        self.has_implementation = has_implementation;
        self
    }

    /// `"{file_path}::{entity_type}::{entity_name}::{chunk_type}"`, with an
    /// 8-hex MD5 suffix (over `file_path::entity_name::entity_type::
    /// start_line::end_line`) appended for implementation chunks that carry
    /// a code range, to prevent collisions between overloaded or textually
    /// identical names.
    pub fn id_string(&self) -> String {
        let file_path = self.file_path.as_deref().unwrap_or("");
        let base = format!(
            "{}::{}::{}::{}",
            file_path,
            self.entity_type,
            self.entity_name,
            self.chunk_type.as_str()
        );
        if self.chunk_type == ChunkType::Implementation {
            if let (Some(start), Some(end)) = (self.line_number, self.end_line_number) {
                let suffix_input = format!(
                    "{}::{}::{}::{}::{}",
                    file_path, self.entity_name, self.entity_type, start, end
                );
                let digest = Md5::digest(suffix_input.as_bytes());
                let suffix = hex::encode(&digest[..4]);
                return format!("{}::{}", base, suffix);
            }
        }
        base
    }

    pub fn content_hash(&self) -> String {
        sha256_hex(&self.content)
    }

    pub fn point_id(&self) -> u64 {
        codegraph_storage::point_id(&self.id_string())
    }

    /// JSON payload matching the stored-point fields (spec §6).
    pub fn payload(&self, collection: &str) -> Value {
        let mut payload = json!({
            "type": "chunk",
            "chunk_type": self.chunk_type.as_str(),
            "entity_name": self.entity_name,
            "entity_type": self.entity_type.as_str(),
            "content": self.content,
            "content_hash": self.content_hash(),
            "collection": collection,
        });
        let map = payload.as_object_mut().expect("payload is always an object");
        if let Some(ref file_path) = self.file_path {
            map.insert("file_path".to_string(), json!(file_path));
        }
        if self.chunk_type == ChunkType::Implementation {
            if let Some(start_line) = self.line_number {
                map.insert("start_line".to_string(), json!(start_line));
            }
            if let Some(end_line) = self.end_line_number {
                map.insert("end_line".to_string(), json!(end_line));
            }
            if let Some(ref metadata) = self.metadata {
                map.insert("semantic_metadata".to_string(), metadata.clone());
            }
        } else {
            if let Some(line_number) = self.line_number {
                map.insert("line_number".to_string(), json!(line_number));
            }
            if self.chunk_type == ChunkType::Metadata {
                map.insert("has_implementation".to_string(), json!(self.has_implementation));
            }
        }
        payload
    }
}

/// A chunk describing a relation between two entity names.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationChunk {
    pub from_entity: String,
    pub to_entity: String,
    pub relation_type: RelationType,
    pub import_type: Option<String>,
    pub context: Option<String>,
    pub confidence: f32,
    pub content: String,
}

impl RelationChunk {
    pub fn new(
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
        relation_type: RelationType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            relation_type,
            import_type: None,
            context: None,
            confidence: 1.0,
            content: content.into(),
        }
    }

    pub fn with_import_type(mut self, import_type: impl Into<String>) -> Self {
        self.import_type = Some(import_type.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// `"{from_entity}::{relation_type}::{to_entity}"`, plus
    /// `"::{import_type}"` when present, so that file-operation variants
    /// between the same two endpoints don't conflate.
    pub fn id_string(&self) -> String {
        let base = format!("{}::{}::{}", self.from_entity, self.relation_type, self.to_entity);
        match &self.import_type {
            Some(tag) => format!("{}::{}", base, tag),
            None => base,
        }
    }

    pub fn content_hash(&self) -> String {
        sha256_hex(&self.content)
    }

    pub fn point_id(&self) -> u64 {
        codegraph_storage::point_id(&self.id_string())
    }

    pub fn payload(&self, collection: &str) -> Value {
        let mut payload = json!({
            "type": "chunk",
            "chunk_type": ChunkType::Relation.as_str(),
            "entity_name": self.from_entity,
            "relation_target": self.to_entity,
            "relation_type": self.relation_type.as_str(),
            "content": self.content,
            "content_hash": self.content_hash(),
            "collection": collection,
            "confidence": self.confidence,
        });
        let map = payload.as_object_mut().expect("payload is always an object");
        if let Some(ref import_type) = self.import_type {
            map.insert("import_type".to_string(), json!(import_type));
        }
        if let Some(ref context) = self.context {
            map.insert("context".to_string(), json!(context));
        }
        payload
    }
}

/// Either shape of stored chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Entity(EntityChunk),
    Relation(RelationChunk),
}

impl Chunk {
    pub fn id_string(&self) -> String {
        match self {
            Chunk::Entity(c) => c.id_string(),
            Chunk::Relation(c) => c.id_string(),
        }
    }

    pub fn content_hash(&self) -> String {
        match self {
            Chunk::Entity(c) => c.content_hash(),
            Chunk::Relation(c) => c.content_hash(),
        }
    }

    pub fn point_id(&self) -> u64 {
        match self {
            Chunk::Entity(c) => c.point_id(),
            Chunk::Relation(c) => c.point_id(),
        }
    }

    pub fn payload(&self, collection: &str) -> Value {
        match self {
            Chunk::Entity(c) => c.payload(collection),
            Chunk::Relation(c) => c.payload(collection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_metadata_id_string() {
        let chunk = EntityChunk::metadata("login", EntityType::Function, "def login(): ...")
            .with_file_path("src/auth.py");
        assert_eq!(chunk.id_string(), "src/auth.py::function::login::metadata");
    }

    #[test]
    fn test_entity_implementation_id_string_has_md5_suffix() {
        let chunk = EntityChunk::implementation("login", EntityType::Function, "def login(): ...")
            .with_file_path("src/auth.py")
            .with_line_range(10, 20);
        let id = chunk.id_string();
        assert!(id.starts_with("src/auth.py::function::login::implementation::"));
        let suffix = id.rsplit("::").next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_overloaded_implementations_get_distinct_ids() {
        let a = EntityChunk::implementation("handler", EntityType::Function, "...")
            .with_file_path("src/app.py")
            .with_line_range(1, 5);
        let b = EntityChunk::implementation("handler", EntityType::Function, "...")
            .with_file_path("src/app.py")
            .with_line_range(10, 15);
        assert_ne!(a.id_string(), b.id_string());
    }

    #[test]
    fn test_relation_chunk_id_string_without_import_type() {
        let chunk = RelationChunk::new("src/a.py", "src/b.py", RelationType::Imports, "imports b");
        assert_eq!(chunk.id_string(), "src/a.py::imports::src/b.py");
    }

    #[test]
    fn test_relation_chunk_id_string_with_import_type() {
        let a = RelationChunk::new("src/a.py", "data.json", RelationType::Imports, "loads data")
            .with_import_type("json_load");
        let b = RelationChunk::new("src/a.py", "data.json", RelationType::Imports, "writes data")
            .with_import_type("json_dump");
        assert_ne!(a.id_string(), b.id_string());
        assert!(a.id_string().ends_with("::json_load"));
    }

    #[test]
    fn test_metadata_payload_fields() {
        let chunk = EntityChunk::metadata("login", EntityType::Function, "summary")
            .with_file_path("src/auth.py")
            .with_line_range(10, 20)
            .with_has_implementation(true);
        let payload = chunk.payload("my-project");
        assert_eq!(payload["type"], "chunk");
        assert_eq!(payload["chunk_type"], "metadata");
        assert_eq!(payload["has_implementation"], true);
        assert_eq!(payload["file_path"], "src/auth.py");
        assert_eq!(payload["line_number"], 10);
    }

    #[test]
    fn test_implementation_payload_has_start_end_line_and_semantic_metadata() {
        let chunk = EntityChunk::implementation("login", EntityType::Function, "def login(): ...")
            .with_file_path("src/auth.py")
            .with_line_range(10, 20)
            .with_metadata(json!({"calls": ["hash_password"], "cyclomatic_complexity": 2}));
        let payload = chunk.payload("my-project");
        assert_eq!(payload["chunk_type"], "implementation");
        assert_eq!(payload["start_line"], 10);
        assert_eq!(payload["end_line"], 20);
        assert!(payload.get("line_number").is_none());
        assert_eq!(payload["semantic_metadata"]["cyclomatic_complexity"], 2);
        assert_eq!(payload["semantic_metadata"]["calls"][0], "hash_password");
    }

    #[test]
    fn test_relation_payload_fields() {
        let chunk = RelationChunk::new("a", "b", RelationType::Calls, "a calls b")
            .with_confidence(0.9)
            .with_context("inside try block");
        let payload = chunk.payload("my-project");
        assert_eq!(payload["relation_target"], "b");
        assert_eq!(payload["relation_type"], "calls");
        assert_eq!(payload["confidence"], 0.9_f32 as f64);
        assert_eq!(payload["context"], "inside try block");
    }

    #[test]
    fn test_point_id_is_deterministic() {
        let chunk = EntityChunk::metadata("x", EntityType::Variable, "content").with_file_path("f.py");
        assert_eq!(chunk.point_id(), chunk.point_id());
    }
}
