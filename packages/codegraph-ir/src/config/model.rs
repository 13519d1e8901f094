//! Configuration record (spec §6 "Environment inputs").

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dense embedding backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Openai,
    Voyage,
}

impl Default for EmbeddingProvider {
    fn default() -> Self {
        EmbeddingProvider::Openai
    }
}

/// The indexing pipeline's full set of runtime options (spec §6).
///
/// Deserializable from YAML or JSON. Unknown keys are deliberately not a
/// hard error (`#[serde(deny_unknown_fields)]` is not used) — see
/// [`Config::load_yaml`] / [`Config::load_json`], which warn on them instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub voyage_api_key: Option<String>,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection_name: String,
    pub embedding_provider: EmbeddingProvider,
    /// Orchestrator file batch (default 50).
    pub batch_size: usize,
    /// Skip files larger than this, in bytes (default 1 MiB).
    pub max_file_size: u64,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Coalescer delay, in seconds (default 2.0).
    pub debounce_seconds: f64,
    /// Cooldown between orphan sweeps, in minutes (0 disables).
    pub cleanup_interval_minutes: u64,
    /// Override for the state-file root; defaults to
    /// `<project_root>/.claude-indexer/` when `None`.
    pub state_directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            voyage_api_key: None,
            qdrant_url: "http://localhost:6333".to_string(),
            qdrant_api_key: None,
            collection_name: "default".to_string(),
            embedding_provider: EmbeddingProvider::default(),
            batch_size: 50,
            max_file_size: 1_048_576,
            include_patterns: vec!["*.py".to_string(), "*.md".to_string()],
            exclude_patterns: vec![
                "*.pyc".to_string(),
                "__pycache__/".to_string(),
                ".git/".to_string(),
                ".venv/".to_string(),
                "node_modules/".to_string(),
                ".env".to_string(),
                "*.log".to_string(),
                ".DS_Store".to_string(),
            ],
            debounce_seconds: 2.0,
            cleanup_interval_minutes: 1,
            state_directory: None,
        }
    }
}

impl Config {
    /// The directory state files are written under for a given project root.
    pub fn state_dir_for(&self, project_root: &std::path::Path) -> PathBuf {
        self.state_directory
            .clone()
            .unwrap_or_else(|| project_root.join(".claude-indexer"))
    }

    /// Whether the orphan-sweep cooldown is disabled.
    pub fn orphan_sweep_disabled(&self) -> bool {
        self.cleanup_interval_minutes == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_documented_values() {
        let config = Config::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_file_size, 1_048_576);
        assert_eq!(config.debounce_seconds, 2.0);
        assert_eq!(config.qdrant_url, "http://localhost:6333");
        assert_eq!(config.embedding_provider, EmbeddingProvider::Openai);
    }

    #[test]
    fn test_state_dir_defaults_under_project_root() {
        let config = Config::default();
        let root = std::path::Path::new("/repo");
        assert_eq!(config.state_dir_for(root), PathBuf::from("/repo/.claude-indexer"));
    }

    #[test]
    fn test_state_dir_override() {
        let mut config = Config::default();
        config.state_directory = Some(PathBuf::from("/custom/state"));
        let root = std::path::Path::new("/repo");
        assert_eq!(config.state_dir_for(root), PathBuf::from("/custom/state"));
    }

    #[test]
    fn test_orphan_sweep_disabled_at_zero() {
        let mut config = Config::default();
        assert!(!config.orphan_sweep_disabled());
        config.cleanup_interval_minutes = 0;
        assert!(config.orphan_sweep_disabled());
    }
}
