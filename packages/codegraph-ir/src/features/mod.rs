//! Feature modules - each feature follows the hexagonal layout where its
//! shape warrants one (domain/ports/application/infrastructure); simpler
//! features are a flat module.

/// C2: parser registry + language parsers (spec §4.1).
pub mod parsing;

/// C3: content hasher + dedup gate (spec §4.2).
pub mod dedup;

/// C4: dense/sparse embedder abstraction (spec §4.3).
pub mod embedding;

/// C6: unified content processor (spec §4.5).
pub mod processing;

/// C7: indexer orchestrator, state file, module resolution (spec §4.6).
pub mod indexing;

/// C8: file-change coalescer/debouncer (spec §4.7).
pub mod file_watcher;

/// C9: include/exclude + size file filter (spec §4.8).
pub mod file_filter;

/// C10: orphan relation cleanup (spec §4.9).
pub mod orphan_cleanup;
