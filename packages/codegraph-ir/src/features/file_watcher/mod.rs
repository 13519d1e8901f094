//! File watcher and two-map change coalescer (spec §4.7).
//!
//! Cross-platform file system event detection via `notify`, debounced
//! through a pending-modified-map/pending-deleted-set coalescer before a
//! batched callback reaches the orchestrator.

pub mod application;
pub mod coalescer;
pub mod infrastructure;
pub mod ports;

pub use application::{FileWatcherUseCase, FileWatcherUseCaseImpl};
pub use coalescer::{ChangeKind, Coalescer};

#[doc(hidden)]
pub use infrastructure::FileWatcher;

pub use ports::{BatchHandler, ChangeBatch, FileChangeEvent, WatchConfig};
