//! Markdown documentation parser (spec §4.1.2).
//!
//! Produces a `File` entity (content type documentation), one entity per
//! `#`/`##` header, and one implementation chunk per top-level/second-level
//! section spanning to the next header of any level.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use sha2::{Digest, Sha256};

use super::ports::{BatchSink, LanguageParser, ParserResult};
use crate::shared::models::{Entity, EntityChunk, EntityType, Relation, RelationType};

struct Header {
    level: usize,
    text: String,
    line: usize,
}

fn parse_headers(content: &str) -> Vec<Header> {
    let mut headers = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if level == 0 || level > 6 {
            continue;
        }
        let rest = trimmed[level..].trim();
        if rest.is_empty() {
            continue;
        }
        headers.push(Header {
            level,
            text: rest.to_string(),
            line: index,
        });
    }
    headers
}

pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for MarkdownParser {
    fn supported_extensions(&self) -> &[&str] {
        &["md", "markdown"]
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

        let mut entities = vec![Entity::builder(file_path.clone(), EntityType::Documentation)
            .file_path(file_path.clone())
            .build()];
        let mut relations = Vec::new();
        let mut impl_chunks = Vec::new();

        let headers = parse_headers(content);
        let lines: Vec<&str> = content.lines().collect();

        for header in &headers {
            let entity_name = format!("{}::header::{}", file_path, header.text);
            entities.push(
                Entity::builder(entity_name.clone(), EntityType::Documentation)
                    .file_path(file_path.clone())
                    .line_range(header.line as u32 + 1, header.line as u32 + 1)
                    .build(),
            );
            relations.push(Relation::new(file_path.clone(), entity_name, RelationType::Contains));
        }

        // One implementation chunk per top-level/second-level section,
        // spanning to the next header of any level (or EOF).
        for (index, header) in headers.iter().enumerate() {
            if header.level > 2 {
                continue;
            }
            let end_line = headers
                .iter()
                .skip(index + 1)
                .map(|h| h.line)
                .next()
                .unwrap_or(lines.len());
            let section_lines = &lines[header.line..end_line.max(header.line + 1)];
            let section_text = section_lines.join("\n");

            let entity_name = format!("{}::header::{}", file_path, header.text);
            let chunk = EntityChunk::implementation(entity_name, EntityType::Documentation, section_text)
                .with_file_path(file_path.clone())
                .with_line_range(header.line as u32 + 1, end_line as u32);
            impl_chunks.push(chunk);
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
