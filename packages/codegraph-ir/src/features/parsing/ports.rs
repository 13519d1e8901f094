//! Parser port: `LanguageParser` and its result type (spec §4.1).

use std::path::Path;
use std::time::Duration;

use crate::shared::models::{Entity, EntityChunk, Relation};

/// Output of parsing one file (spec §4.1). A non-empty `errors` list means
/// the file failed; partial results may still be present (§7, §8 "File
/// with syntax errors").
#[derive(Debug, Clone, Default)]
pub struct ParserResult {
    pub file_path: String,
    pub content_hash: String,
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub implementation_chunks: Vec<EntityChunk>,
    pub parse_duration: Duration,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ParserResult {
    pub fn is_failed(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Optional streaming sink a parser may invoke with partial
/// `(entities, relations, chunks)` tuples during parsing (§4.1.4). Used for
/// pathologically large inputs where the parser returns counts rather than
/// full lists. The sink is expected to embed and store the batch
/// synchronously before `parse` continues.
pub trait BatchSink: Send {
    fn accept(&mut self, entities: Vec<Entity>, relations: Vec<Relation>, chunks: Vec<EntityChunk>);
}

/// One language/file-kind parser. The registry picks the first whose
/// `can_parse` predicate (derived from `supported_extensions`) matches.
pub trait LanguageParser: Send + Sync {
    fn supported_extensions(&self) -> &[&str];

    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.supported_extensions().contains(&ext))
            .unwrap_or(false)
    }

    /// `known_entity_names` is the read-only set of entity names already
    /// known (prior entities in this file plus any globally supplied set)
    /// used to filter `calls` relations to known callees (§4.1.1, §9:
    /// "replace sentinel pseudo-entities with a plain set of known entity
    /// names").
    fn parse(
        &self,
        path: &Path,
        content: &str,
        known_entity_names: &std::collections::HashSet<String>,
        batch_sink: Option<&mut dyn BatchSink>,
    ) -> ParserResult;
}
