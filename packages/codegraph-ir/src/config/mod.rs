//! Runtime configuration (spec §6 "Environment inputs").
//!
//! [`Config`] is the single source of truth for embedding provider, store
//! connection, batching, include/exclude patterns, and debounce/cleanup
//! timing. It loads from YAML or JSON via [`Config::load_yaml`] /
//! [`Config::load_json`], falling back to [`Config::default`] field-by-field
//! for anything a file omits. Unknown keys are logged with `tracing::warn!`
//! rather than rejected, so older config files keep working across schema
//! additions.

mod error;
mod io;
mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{Config, EmbeddingProvider};
