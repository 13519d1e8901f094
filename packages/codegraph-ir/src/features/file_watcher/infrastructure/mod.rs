//! Infrastructure - External dependency implementations
//!
//! Uses `notify` crate for cross-platform file system events

mod file_watcher;

pub use file_watcher::FileWatcher;
