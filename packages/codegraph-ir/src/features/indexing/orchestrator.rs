//! Indexer orchestrator (spec §4.6): discovery, diff, per-file
//! parse-then-process, atomic state update, and the global entity-name
//! cache relation filtering reads from.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant, UNIX_EPOCH};

use codegraph_storage::{Distance, FieldCondition, PointFilter, VectorStore};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use super::state::{FileState, StateFile};
use crate::config::Config;
use crate::features::embedding::{DenseEmbedder, SparseEmbedder};
use crate::features::orphan_cleanup::{self, resolves_as_module, sweep_due, OrphanSweepResult};
use crate::features::parsing::ParserRegistry;
use crate::features::processing::{ContentProcessor, ProcessingResult};
use crate::shared::models::Result;

/// Aggregate outcome of one `Orchestrator::run`.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub mode: RunMode,
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_deleted: usize,
    pub failed_files: Vec<String>,
    pub processing: ProcessingResult,
    pub orphan_sweep: Option<OrphanSweepResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Full,
    Incremental,
}

pub struct Orchestrator<'a> {
    store: &'a dyn VectorStore,
    dense: &'a dyn DenseEmbedder,
    sparse: Option<&'a dyn SparseEmbedder>,
    registry: &'a ParserRegistry,
    config: &'a Config,
    project_root: PathBuf,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn VectorStore,
        dense: &'a dyn DenseEmbedder,
        registry: &'a ParserRegistry,
        config: &'a Config,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            dense,
            sparse: None,
            registry,
            config,
            project_root: project_root.into(),
        }
    }

    pub fn with_sparse(mut self, sparse: &'a dyn SparseEmbedder) -> Self {
        self.sparse = Some(sparse);
        self
    }

    /// Runs one full discover → diff → process → atomic-state-write pass
    /// (spec §4.6). `last_sweep` gates the trailing orphan sweep via the
    /// configured cooldown.
    pub async fn run(&self, last_sweep: Option<Instant>) -> Result<RunReport> {
        let collection = &self.config.collection_name;

        if !self.store.collection_exists(collection).await? {
            self.store
                .create_collection(collection, self.dense.vector_size(), Distance::Cosine)
                .await?;
        }

        let state_dir = self.config.state_dir_for(&self.project_root);
        let state_path = StateFile::path_for(&state_dir, collection);
        let mut state = StateFile::load(&state_path);
        let mode = if state.files.is_empty() { RunMode::Full } else { RunMode::Incremental };

        let discovered = self.discover_files();
        let mut current: HashMap<String, (PathBuf, String, FileState)> = HashMap::new();
        for path in &discovered {
            let Ok(relative) = path.strip_prefix(&self.project_root) else { continue };
            let relative_str = relative.to_string_lossy().replace('\\', "/");

            let Ok(content) = std::fs::read_to_string(path) else {
                tracing::warn!(path = %path.display(), "skipping unreadable/non-UTF-8 file");
                continue;
            };
            let hash = format!("{:x}", Sha256::digest(content.as_bytes()));
            let metadata = path.metadata().ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let mtime = metadata
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);

            current.insert(relative_str.clone(), (path.clone(), content, FileState { hash, size, mtime }));
        }

        let deleted_paths: Vec<String> = state
            .files
            .keys()
            .filter(|path| !current.contains_key(*path))
            .cloned()
            .collect();

        let scheduled: Vec<&String> = current
            .keys()
            .filter(|relative| {
                state
                    .files
                    .get(*relative)
                    .map(|prior| prior.hash != current[*relative].2.hash)
                    .unwrap_or(true)
            })
            .collect();

        // Global entity-name cache (spec §4.6): populated once per run by
        // scrolling non-relation points, then grown as this run's files
        // contribute new entities.
        let all_points = codegraph_storage::scroll_all(self.store, collection, None, false, 500, 1000).await?;
        let mut known_entity_names: HashSet<String> = all_points
            .iter()
            .filter(|p| p.payload.get("chunk_type").and_then(|v| v.as_str()) != Some("relation"))
            .filter_map(|p| p.payload.get("entity_name").and_then(|v| v.as_str()).map(str::to_string))
            .collect();

        let mut report = RunReport {
            mode,
            files_discovered: discovered.len(),
            ..Default::default()
        };
        let mut changed_entity_ids = HashSet::new();

        for relative in scheduled {
            let (path, content, snapshot) = &current[relative];

            if state.files.contains_key(relative) {
                let filter = PointFilter::new().with(FieldCondition::Equals {
                    key: "file_path".to_string(),
                    value: relative.clone(),
                });
                self.store.delete_by_filter(collection, &filter).await?;
            }

            let Some(parser) = self.registry.find(path) else {
                tracing::warn!(path = %path.display(), "no parser registered for this file kind");
                continue;
            };

            let parsed = parser.parse(path, content, &known_entity_names, None);
            if parsed.is_failed() {
                report.failed_files.push(relative.clone());
                tracing::warn!(path = %path.display(), errors = ?parsed.errors, "file failed to parse, state entry not updated");
                continue;
            }

            for entity in &parsed.entities {
                known_entity_names.insert(entity.name().to_string());
            }

            let filtered_relations: Vec<_> = parsed
                .relations
                .into_iter()
                .filter(|r| {
                    let from_ok = known_entity_names.contains(&r.from_entity)
                        || resolves_as_module(&r.from_entity, &known_entity_names);
                    let to_ok = known_entity_names.contains(&r.to_entity)
                        || resolves_as_module(&r.to_entity, &known_entity_names)
                        || orphan_cleanup::is_external_file_reference(&r.to_entity);
                    from_ok && to_ok
                })
                .collect();

            let mut processor = ContentProcessor::new(self.store, self.dense, collection.clone());
            if let Some(sparse) = self.sparse {
                processor = processor.with_sparse(sparse);
            }

            let outcome = processor
                .process_all_content(
                    &parsed.entities,
                    &filtered_relations,
                    &parsed.implementation_chunks,
                    &mut changed_entity_ids,
                    false,
                )
                .await?;

            report.processing.entities_processed += outcome.entities_processed;
            report.processing.relations_processed += outcome.relations_processed;
            report.processing.implementations_processed += outcome.implementations_processed;
            report.processing.points_written += outcome.points_written;
            report.processing.embedding_cost += outcome.embedding_cost;
            report.processing.token_count += outcome.token_count;
            report.processing.errors.extend(outcome.errors);

            state.files.insert(relative.clone(), snapshot.clone());
            report.files_processed += 1;
        }

        for relative in &deleted_paths {
            let by_file_path = PointFilter::new().with(FieldCondition::Equals {
                key: "file_path".to_string(),
                value: relative.clone(),
            });
            self.store.delete_by_filter(collection, &by_file_path).await?;

            let by_entity_name = PointFilter::new().with(FieldCondition::Equals {
                key: "entity_name".to_string(),
                value: relative.clone(),
            });
            self.store.delete_by_filter(collection, &by_entity_name).await?;

            state.files.remove(relative);
            report.files_deleted += 1;
        }

        if !deleted_paths.is_empty() || !report.failed_files.is_empty() || report.files_processed > 0 {
            if !self.config.orphan_sweep_disabled() {
                let cooldown = Duration::from_secs(self.config.cleanup_interval_minutes * 60);
                if sweep_due(last_sweep, cooldown) {
                    report.orphan_sweep = Some(orphan_cleanup::sweep(self.store, collection).await?);
                }
            }
        }

        state.save(&state_path)?;

        Ok(report)
    }

    fn discover_files(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.project_root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                crate::features::file_filter::should_process(
                    path,
                    &self.project_root,
                    &self.config.include_patterns,
                    &self.config.exclude_patterns,
                    self.config.max_file_size,
                )
            })
            .collect()
    }
}
