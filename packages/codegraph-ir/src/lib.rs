//! codegraph-ir: the indexing pipeline that turns a project's source tree
//! into searchable entities, relations, and content chunks in a vector
//! store.
//!
//! Feature-first hexagonal layout:
//! - `shared`   — data model (`Entity`, `Relation`, `Chunk`, `Span`, errors)
//!   and utilities with no dependency on any single feature.
//! - `features` — vertical slices: parsing, dedup, embedding, processing,
//!   indexing, file watching, file filtering, orphan cleanup. Each slice
//!   that needs one follows domain/ports/application/infrastructure.
//! - `config`   — runtime configuration (spec §6).

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod config;
pub mod features;
pub mod shared;

pub use shared::models::{
    Chunk, ChunkType, CodegraphError, Entity, EntityBuilder, EntityChunk, EntityType, ErrorKind,
    Location, Relation, RelationChunk, RelationType, Result, Span,
};

pub use config::Config;
