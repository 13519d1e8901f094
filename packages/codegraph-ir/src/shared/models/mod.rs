//! Shared data model: the typed records the parsers (C2) produce and the
//! processor (C6) turns into stored points (spec §3).

mod chunk;
mod entity;
mod error;
mod relation;
mod span;

pub use chunk::{Chunk, ChunkType, EntityChunk, RelationChunk};
pub use entity::{Entity, EntityBuilder, EntityType};
pub use error::{CodegraphError, ErrorKind, Result};
pub use relation::{Relation, RelationType};
pub use span::{Location, Span};

pub use serde_json::Value;
