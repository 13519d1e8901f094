//! Infrastructure layer - VectorStore adapters
//!
//! - `memory_store`: in-memory reference adapter, used by tests and as the
//!   default/dev backend (mirrors the teacher's in-memory storage for
//!   `CodeSnapshotStore` tests).
//! - `qdrant_http`: HTTP adapter shaped like the Qdrant REST API.

pub mod memory_store;
pub mod qdrant_http;

pub use memory_store::InMemoryVectorStore;
pub use qdrant_http::QdrantHttpStore;
