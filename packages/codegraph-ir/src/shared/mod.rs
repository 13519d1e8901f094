//! Shared module - common types and utilities used across features.
//! Has zero dependency on any single feature module.

pub mod constants;
pub mod models;
pub mod utils;

pub use models::*;
pub use utils::ScopeStack;
