//! Per-collection state file (spec §4.6, §5, §6):
//! `<state_dir>/<collection>.json`, mapping each relative file path to
//! `{hash, size, mtime}`, written atomically (temp + rename). Readers
//! tolerate absence and malformed JSON by treating state as empty.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::models::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileState {
    pub hash: String,
    pub size: u64,
    pub mtime: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(flatten)]
    pub files: HashMap<String, FileState>,
    #[serde(rename = "_statistics", skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Value>,
}

impl StateFile {
    pub fn path_for(state_dir: &Path, collection: &str) -> PathBuf {
        state_dir.join(format!("{collection}.json"))
    }

    /// Reads the state file at `path`. Absence or malformed JSON is treated
    /// as empty state rather than an error (spec §5 "Readers tolerate
    /// absence and malformed JSON by treating state as empty and logging").
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %err, "failed to read state file, treating as empty");
                }
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "malformed state file, treating as empty");
                Self::default()
            }
        }
    }

    /// Writes atomically: serialize to `<path>.tmp`, then rename over
    /// `path` (spec §4.6, §5 "written to `<state>.tmp`, rename to
    /// `<state>`; on crash, the previous file remains valid").
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_returns_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let state = StateFile::load(&path);
        assert!(state.files.is_empty());
    }

    #[test]
    fn test_load_malformed_file_returns_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not valid json").unwrap();
        let state = StateFile::load(&path);
        assert!(state.files.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proj.json");

        let mut state = StateFile::default();
        state.files.insert(
            "src/app.py".to_string(),
            FileState {
                hash: "abc123".to_string(),
                size: 512,
                mtime: 1700000000.0,
            },
        );
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path);
        assert_eq!(loaded.files.get("src/app.py").unwrap().hash, "abc123");
    }

    #[test]
    fn test_save_leaves_no_tmp_file_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("proj.json");
        StateFile::default().save(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
