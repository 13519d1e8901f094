//! Line-window text/log parser, CSV parser, and INI/CONF/CFG parser
//! (spec §4.1.3).

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use sha2::{Digest, Sha256};

use super::ports::{BatchSink, LanguageParser, ParserResult};
use crate::shared::constants::text_window::{DEFAULT_MAX_CHARS, DEFAULT_WINDOW_LINES};
use crate::shared::models::{Entity, EntityChunk, EntityType, Relation, RelationType};

/// Fixed-size line-window parser for plain text and log files. Produces a
/// `File` entity plus one chunk-entity per `DEFAULT_WINDOW_LINES`-line
/// window, each carrying an implementation chunk (truncated to
/// `DEFAULT_MAX_CHARS`) and a preview metadata observation.
pub struct TextWindowParser {
    window_lines: usize,
    max_chars: usize,
}

impl TextWindowParser {
    pub fn new() -> Self {
        Self {
            window_lines: DEFAULT_WINDOW_LINES,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl Default for TextWindowParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for TextWindowParser {
    fn supported_extensions(&self) -> &[&str] {
        &["txt", "log"]
    }

    fn parse(
        &self,
        path: &Path,
        content: &str,
        _known_entity_names: &HashSet<String>,
        mut batch_sink: Option<&mut dyn BatchSink>,
    ) -> ParserResult {
        let start = Instant::now();
        let file_path = path.to_string_lossy().to_string();
        let content_hash = format!("{:x}", Sha256::digest(content.as_bytes()));

        let mut entities = vec![Entity::builder(file_path.clone(), EntityType::File)
            .file_path(file_path.clone())
            .build()];
        let mut relations = Vec::new();
        let mut impl_chunks = Vec::new();

        let lines: Vec<&str> = content.lines().collect();
        for (window_index, window) in lines.chunks(self.window_lines.max(1)).enumerate() {
            let start_line = window_index * self.window_lines + 1;
            let end_line = start_line + window.len().saturating_sub(1);
            let window_name = format!("{}:window:{}", file_path, window_index);

            let mut text = window.join("\n");
            if text.len() > self.max_chars {
                text.truncate(self.max_chars);
            }

            entities.push(
                Entity::builder(window_name.clone(), EntityType::TextChunk)
                    .file_path(file_path.clone())
                    .line_range(start_line as u32, end_line as u32)
                    .observation(preview(&text))
                    .build(),
            );
            relations.push(Relation::new(file_path.clone(), window_name.clone(), RelationType::Contains));
            impl_chunks.push(
                EntityChunk::implementation(window_name, EntityType::TextChunk, text)
                    .with_file_path(file_path.clone())
                    .with_line_range(start_line as u32, end_line as u32),
            );
        }

        if let Some(sink) = batch_sink.as_deref_mut() {
            sink.accept(entities.clone(), relations.clone(), impl_chunks.clone());
        }

        ParserResult {
            file_path,
            content_hash,
            entities,
            relations,
            implementation_chunks: impl_chunks,
            parse_duration: start.elapsed(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(200).collect();
    if text.chars().count() > 200 {
        preview.push('…');
    }
    preview
}

/// CSV parser: one entity per column header, carrying position and row
/// count (spec §4.1.3).
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for CsvParser {
    fn supported_extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn parse(
        &self,
        path: &Path,
        content: &str,
        _known_entity_names: &HashSet<String>,
        mut batch_sink: Option<&mut dyn BatchSink>,
    ) -> ParserResult {
        let start = Instant::now();
        let file_path = path.to_string_lossy().to_string();
        let content_hash = format!("{:x}", Sha256::digest(content.as_bytes()));

        let mut entities = vec![Entity::builder(file_path.clone(), EntityType::File)
            .file_path(file_path.clone())
            .build()];
        let mut relations = Vec::new();

        let mut lines = content.lines();
        if let Some(header_line) = lines.next() {
            let row_count = lines.count();
            for (position, column) in header_line.split(',').enumerate() {
                let column = column.trim().trim_matches('"');
                if column.is_empty() {
                    continue;
                }
                let entity_name = format!("{}::column::{}", file_path, column);
                entities.push(
                    Entity::builder(entity_name.clone(), EntityType::Variable)
                        .file_path(file_path.clone())
                        .observation(format!("column {position} of {row_count} data rows"))
                        .build(),
                );
                relations.push(Relation::new(file_path.clone(), entity_name, RelationType::Contains));
            }
        }

        if let Some(sink) = batch_sink.as_deref_mut() {
            sink.accept(entities.clone(), relations.clone(), Vec::new());
        }

        ParserResult {
            file_path,
            content_hash,
            entities,
            relations,
            implementation_chunks: Vec::new(),
            parse_duration: start.elapsed(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// INI/CONF/CFG parser: one entity per `[section]`, one per `key` within a
/// section, `contains` relations section→key and file→section (spec
/// §4.1.3).
pub struct IniParser;

impl IniParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IniParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for IniParser {
    fn supported_extensions(&self) -> &[&str] {
        &["ini", "conf", "cfg"]
    }

    fn parse(
        &self,
        path: &Path,
        content: &str,
        _known_entity_names: &HashSet<String>,
        mut batch_sink: Option<&mut dyn BatchSink>,
    ) -> ParserResult {
        let start = Instant::now();
        let file_path = path.to_string_lossy().to_string();
        let content_hash = format!("{:x}", Sha256::digest(content.as_bytes()));

        let mut entities = vec![Entity::builder(file_path.clone(), EntityType::File)
            .file_path(file_path.clone())
            .build()];
        let mut relations = Vec::new();
        let mut current_section: Option<String> = None;

        for (line_number, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(stripped) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let section_name = format!("{}::section::{}", file_path, stripped);
                entities.push(
                    Entity::builder(section_name.clone(), EntityType::Variable)
                        .file_path(file_path.clone())
                        .line_range(line_number as u32 + 1, line_number as u32 + 1)
                        .build(),
                );
                relations.push(Relation::new(file_path.clone(), section_name.clone(), RelationType::Contains));
                current_section = Some(section_name);
                continue;
            }
            if let Some((key, _value)) = line.split_once('=').or_else(|| line.split_once(':')) {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                let Some(section_name) = &current_section else { continue };
                let key_name = format!("{}::key::{}", section_name, key);
                entities.push(
                    Entity::builder(key_name.clone(), EntityType::Variable)
                        .file_path(file_path.clone())
                        .line_range(line_number as u32 + 1, line_number as u32 + 1)
                        .build(),
                );
                relations.push(Relation::new(section_name.clone(), key_name, RelationType::Contains));
            }
        }

        if let Some(sink) = batch_sink.as_deref_mut() {
            sink.accept(entities.clone(), relations.clone(), Vec::new());
        }

        ParserResult {
            file_path,
            content_hash,
            entities,
            relations,
            implementation_chunks: Vec::new(),
            parse_duration: start.elapsed(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_window_parser_splits_into_windows() {
        let parser = TextWindowParser::new();
        let content = (0..120).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let result = parser.parse(Path::new("app.log"), &content, &HashSet::new(), None);
        // 120 lines / 50-line windows -> 3 windows.
        let window_entities = result
            .entities
            .iter()
            .filter(|e| e.entity_type() == EntityType::TextChunk)
            .count();
        assert_eq!(window_entities, 3);
        assert_eq!(result.implementation_chunks.len(), 3);
    }

    #[test]
    fn test_csv_parser_one_entity_per_column() {
        let parser = CsvParser::new();
        let content = "id,name,email\n1,alice,a@x.com\n2,bob,b@x.com\n";
        let result = parser.parse(Path::new("data.csv"), content, &HashSet::new(), None);
        let column_count = result.entities.len() - 1; // minus File entity
        assert_eq!(column_count, 3);
    }

    #[test]
    fn test_ini_parser_section_and_key_relations() {
        let parser = IniParser::new();
        let content = "[server]\nhost = localhost\nport = 8080\n";
        let result = parser.parse(Path::new("app.ini"), content, &HashSet::new(), None);
        let has_section_contains = result
            .relations
            .iter()
            .any(|r| r.relation_type == RelationType::Contains && r.to_entity.ends_with("section::server"));
        let has_key_contains = result
            .relations
            .iter()
            .any(|r| r.relation_type == RelationType::Contains && r.to_entity.ends_with("key::host"));
        assert!(has_section_contains);
        assert!(has_key_contains);
    }

    #[test]
    fn test_empty_ini_produces_only_file_entity() {
        let parser = IniParser::new();
        let result = parser.parse(Path::new("empty.ini"), "", &HashSet::new(), None);
        assert_eq!(result.entities.len(), 1);
    }
}
