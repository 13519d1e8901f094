//! Ports - Interface definitions for File Watcher
//!
//! Domain-driven design: Pure trait definitions with no external dependencies

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// File change event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl FileChangeEvent {
    pub fn path(&self) -> &PathBuf {
        match self {
            FileChangeEvent::Created(p) => p,
            FileChangeEvent::Modified(p) => p,
            FileChangeEvent::Deleted(p) => p,
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            FileChangeEvent::Created(_) => "created",
            FileChangeEvent::Modified(_) => "modified",
            FileChangeEvent::Deleted(_) => "deleted",
        }
    }
}

/// Configuration for file watcher
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Root directory to watch
    pub root_path: PathBuf,

    /// File extensions to watch (e.g., ["py", "rs", "ts"])
    /// If empty, watches all files
    pub extensions: Vec<String>,

    /// Per-file quiet interval: a batch is emitted once this much time has
    /// elapsed since the most recent change to every pending path (spec
    /// §4.7).
    pub quiet_interval: Duration,

    /// A batch is emitted immediately once the pending set reaches this
    /// size, regardless of quiet interval (spec §4.7).
    pub max_batch_size: usize,

    /// Patterns to ignore (glob patterns)
    pub ignore_patterns: Vec<String>,

    /// Enable recursive watching of subdirectories
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            extensions: vec!["py".to_string(), "rs".to_string(), "ts".to_string()],
            quiet_interval: Duration::from_secs(2),
            max_batch_size: 100,
            ignore_patterns: vec![
                "**/node_modules/**".to_string(),
                "**/.git/**".to_string(),
                "**/target/**".to_string(),
                "**/__pycache__/**".to_string(),
            ],
            recursive: true,
        }
    }
}

/// One coalesced batch: every path touched since the last batch, split into
/// modified (created or modified, still present) and deleted, plus the
/// instant the batch was emitted (spec §4.7).
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    pub modified_files: Vec<PathBuf>,
    pub deleted_files: Vec<PathBuf>,
    pub emitted_at: Instant,
}

/// Trait for handling a coalesced batch of file changes.
pub trait BatchHandler: Send + Sync {
    /// Called once per emitted batch (quiet-interval elapsed or max-batch
    /// threshold reached).
    fn handle_batch(&mut self, batch: ChangeBatch) -> Result<(), String>;

    /// Called when an error occurs in the watcher.
    fn handle_error(&mut self, error: String);
}
