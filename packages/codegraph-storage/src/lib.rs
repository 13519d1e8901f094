//! Vector-store abstraction (spec §4.4 / §C5): a Qdrant-shaped point store
//! behind a single `VectorStore` trait, with an in-memory reference adapter
//! and an HTTP adapter.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use codegraph_storage::{VectorStore, Distance, Point, UpsertConfig};
//!
//! async fn example(store: impl VectorStore) -> codegraph_storage::Result<()> {
//!     store.create_collection("my-project", 768, Distance::Cosine).await?;
//!
//!     let point = Point::new(
//!         "src/auth.py::function::login::metadata",
//!         serde_json::json!({"type": "chunk", "chunk_type": "metadata"}),
//!     )
//!     .with_dense(vec![0.0; 768]);
//!
//!     store.upsert_points("my-project", vec![point], UpsertConfig::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{Result, StorageError};

pub use domain::{
    point_id, scroll_all, Distance, FieldCondition, IdCollision, Point, PointFilter, ScoredPoint,
    ScrollPage, SparseVector, UpsertConfig, UpsertReport, VectorStore,
};

pub use infrastructure::{InMemoryVectorStore, QdrantHttpStore};
