//! Domain layer for the vector-store abstraction.
//!
//! - `point`: `Point`, `ScoredPoint`, `ScrollPage`, `PointFilter`, point-ID
//!   derivation (spec §3, §4.4.1, §6).
//! - `ports`: the `VectorStore` trait (spec §4.4).

pub mod point;
pub mod ports;

pub use point::{
    point_id, Distance, FieldCondition, Point, PointFilter, ScoredPoint, ScrollPage, SparseVector,
};
pub use ports::{scroll_all, IdCollision, UpsertConfig, UpsertReport, VectorStore};
