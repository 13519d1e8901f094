//! Python code parser (spec §4.1.1): entities, relations, file-operation
//! imports, and implementation chunks extracted via tree-sitter plus a
//! light regex-based semantic pass over raw source.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use regex::Regex;
use sha2::{Digest, Sha256};
use tree_sitter::{Node, Parser};

use super::ports::{BatchSink, LanguageParser, ParserResult};
use crate::shared::models::{Entity, EntityChunk, EntityType, Relation, RelationType};
use crate::shared::utils::tree_sitter::{
    extract_base_classes, extract_docstring, extract_node_text, extract_node_text_owned,
    extract_parameters, find_block_child, find_children_by_kind, find_descendants_by_kind,
    node_to_span,
};

/// Recognized file-operation call patterns (spec §4.1.1 table). Each entry
/// is a regex whose single capture group is the string-literal path/URL
/// argument, matched when that literal appears as the call's leading
/// positional argument.
struct FileOpPattern {
    regex: Regex,
    import_type: &'static str,
}

fn file_op_patterns() -> Vec<FileOpPattern> {
    let specs: &[(&str, &str)] = &[
        (r#"(?:^|[^.\w])open\(\s*["']([^"']+)["']"#, "file_open"),
        (r#"Path\(\s*["']([^"']+)["']\s*\)\.open\("#, "path_open"),
        (r#"(?:pandas|pd)\.read_json\(\s*["']([^"']+)["']"#, "pandas_json_read"),
        (r#"(?:pandas|pd)\.read_csv\(\s*["']([^"']+)["']"#, "pandas_csv_read"),
        (r#"(?:pandas|pd)\.read_excel\(\s*["']([^"']+)["']"#, "pandas_excel_read"),
        (r#"\.to_json\(\s*["']([^"']+)["']"#, "pandas_json_write"),
        (r#"\.to_csv\(\s*["']([^"']+)["']"#, "pandas_csv_write"),
        (r#"\.to_excel\(\s*["']([^"']+)["']"#, "pandas_excel_write"),
        (r#"requests\.get\(\s*["']([^"']+)["']"#, "requests_get"),
        (r#"requests\.post\(\s*["']([^"']+)["']"#, "requests_post"),
        (r#"urllib\.request\.urlopen\(\s*["']([^"']+)["']"#, "urllib_open"),
        (r#"toml\.load\(\s*["']([^"']+)["']"#, "toml_read"),
        (r#"(?:ElementTree|ET)\.parse\(\s*["']([^"']+)["']"#, "xml_parse"),
        (r#"configparser\.\w+\(\)\.read\(\s*["']([^"']+)["']"#, "config_ini_read"),
    ];
    specs
        .iter()
        .map(|(pattern, tag)| FileOpPattern {
            regex: Regex::new(pattern).expect("static file-op pattern compiles"),
            import_type: tag,
        })
        .collect()
}

const CONTROL_FLOW_KEYWORDS: &[&str] = &["if", "elif", "for", "while", "try", "except", "with"];

pub struct PythonParser {
    file_op_patterns: Vec<FileOpPattern>,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            file_op_patterns: file_op_patterns(),
        }
    }

    fn extract_file_operations(&self, source: &str, file_path: &str) -> Vec<Relation> {
        let mut relations = Vec::new();
        for pattern in &self.file_op_patterns {
            for capture in pattern.regex.captures_iter(source) {
                let Some(target) = capture.get(1) else { continue };
                let relation = Relation::new(file_path, target.as_str(), RelationType::Imports)
                    .with_import_type(pattern.import_type);
                relations.push(relation);
            }
        }
        relations
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

struct Definition<'a> {
    node: Node<'a>,
    kind: EntityType,
}

fn collect_definitions<'a>(root: &Node<'a>) -> Vec<Definition<'a>> {
    let mut defs = Vec::new();
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "function_definition" => defs.push(Definition { node, kind: EntityType::Function }),
            "class_definition" => defs.push(Definition { node, kind: EntityType::Class }),
            _ => {}
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    defs
}

fn collect_identifiers(node: &Node, source: &str) -> Vec<String> {
    match node.kind() {
        "identifier" => vec![extract_node_text_owned(node, source)],
        _ => find_descendants_by_kind(node, "identifier")
            .iter()
            .map(|n| extract_node_text_owned(n, source))
            .collect(),
    }
}

impl LanguageParser for PythonParser {
    fn supported_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse(
        &self,
        path: &Path,
        content: &str,
        known_entity_names: &HashSet<String>,
        mut batch_sink: Option<&mut dyn BatchSink>,
    ) -> ParserResult {
        let start = Instant::now();
        let file_path = path.to_string_lossy().to_string();
        let content_hash = format!("{:x}", Sha256::digest(content.as_bytes()));

        let mut result = ParserResult {
            file_path: file_path.clone(),
            content_hash,
            ..Default::default()
        };

        let mut parser = Parser::new();
        if let Err(err) = parser.set_language(&tree_sitter_python::language()) {
            result.errors.push(format!("failed to set tree-sitter language: {err}"));
            return result;
        }

        let Some(tree) = parser.parse(content, None) else {
            result.errors.push("tree-sitter failed to parse file".to_string());
            return result;
        };
        let root = tree.root_node();

        let mut local_known: HashSet<String> = known_entity_names.clone();
        let mut entities = Vec::new();
        let mut relations = Vec::new();
        let mut impl_chunks = Vec::new();

        // File entity goes first (§5 ordering guarantee).
        let file_entity = Entity::builder(file_path.clone(), EntityType::File)
            .file_path(file_path.clone())
            .build();
        entities.push(file_entity);

        // Module-level variable / binding extraction (function- and
        // block-local assignments are skipped per §4.1.1).
        for child in root.children(&mut root.walk()) {
            match child.kind() {
                "expression_statement" => {
                    if let Some(assignment) = child.child(0) {
                        if assignment.kind() == "assignment"
                            && assignment.child_by_field_name("right").is_some()
                        {
                            if let Some(lhs) = assignment.child_by_field_name("left") {
                                for name in collect_identifiers(&lhs, content) {
                                    if local_known.insert(name.clone()) {
                                        entities.push(
                                            Entity::builder(name, EntityType::Variable)
                                                .file_path(file_path.clone())
                                                .line_range(
                                                    child.start_position().row as u32 + 1,
                                                    child.end_position().row as u32 + 1,
                                                )
                                                .build(),
                                        );
                                    }
                                }
                            }
                        }
                    }
                }
                "with_statement" | "try_statement" => {
                    for as_pattern in find_descendants_by_kind(&child, "as_pattern") {
                        if let Some(target) = as_pattern.child(as_pattern.child_count().saturating_sub(1)) {
                            if target.kind() == "identifier" {
                                let name = extract_node_text_owned(&target, content);
                                if local_known.insert(name.clone()) {
                                    entities.push(
                                        Entity::builder(name, EntityType::Variable)
                                            .file_path(file_path.clone())
                                            .line_range(
                                                child.start_position().row as u32 + 1,
                                                child.end_position().row as u32 + 1,
                                            )
                                            .build(),
                                    );
                                }
                            }
                        }
                    }
                }
                "import_statement" => {
                    for dotted in find_children_by_kind(&child, "dotted_name") {
                        let name = extract_node_text_owned(&dotted, content);
                        local_known.insert(name.clone());
                        entities.push(
                            Entity::builder(name.clone(), EntityType::Import)
                                .file_path(file_path.clone())
                                .line_range(
                                    child.start_position().row as u32 + 1,
                                    child.end_position().row as u32 + 1,
                                )
                                .build(),
                        );
                        relations.push(Relation::new(file_path.clone(), name, RelationType::Imports));
                    }
                    for aliased in find_children_by_kind(&child, "aliased_import") {
                        if let Some(dotted) = aliased.child(0) {
                            let name = extract_node_text_owned(&dotted, content);
                            local_known.insert(name.clone());
                            entities.push(
                                Entity::builder(name.clone(), EntityType::Import)
                                    .file_path(file_path.clone())
                                    .build(),
                            );
                            relations.push(Relation::new(file_path.clone(), name, RelationType::Imports));
                        }
                    }
                }
                "import_from_statement" => {
                    if let Some(module_name) = child.child_by_field_name("module_name") {
                        let name = extract_node_text_owned(&module_name, content);
                        local_known.insert(name.clone());
                        entities.push(
                            Entity::builder(name.clone(), EntityType::Import)
                                .file_path(file_path.clone())
                                .line_range(
                                    child.start_position().row as u32 + 1,
                                    child.end_position().row as u32 + 1,
                                )
                                .build(),
                        );
                        relations.push(Relation::new(file_path.clone(), name, RelationType::Imports));
                    }
                }
                _ => {}
            }
        }

        // Function/class definitions (any depth, per §4.1.1's "one entity
        // per definition node" with no scope restriction).
        for def in collect_definitions(&root) {
            let Some(name_node) = def.node.child_by_field_name("name") else {
                continue;
            };
            let name = extract_node_text_owned(&name_node, content);
            let span = node_to_span(&def.node);
            local_known.insert(name.clone());

            let block = find_block_child(&def.node);
            let docstring = block.as_ref().and_then(|b| extract_docstring(b, content));

            let signature = if def.kind == EntityType::Function {
                def.node
                    .child_by_field_name("parameters")
                    .map(|p| format!("def {}({})", name, extract_parameters(&p, content).join(", ")))
            } else {
                None
            };

            let mut builder = Entity::builder(name.clone(), def.kind)
                .file_path(file_path.clone())
                .line_range(span.start_line, span.end_line);
            if let Some(doc) = &docstring {
                builder = builder.docstring(doc.clone());
            }
            if let Some(sig) = &signature {
                builder = builder.signature(sig.clone());
            }
            entities.push(builder.build());

            if def.kind == EntityType::Class {
                for base in extract_base_classes(&def.node, content) {
                    relations.push(Relation::new(name.clone(), base, RelationType::Inherits));
                }
            }

            // Implementation chunk + semantic metadata.
            let full_source = extract_node_text(&def.node, content);
            let calls = extract_call_names(full_source);
            let attrs = extract_attribute_refs(full_source);
            let exceptions = extract_exception_names(full_source);
            let complexity = 1 + count_control_flow_keywords(full_source);

            let semantic_metadata = serde_json::json!({
                "calls": calls.clone(),
                "referenced_attrs": attrs,
                "caught_exceptions": exceptions,
                "cyclomatic_complexity": complexity,
            });

            let chunk = EntityChunk::implementation(name.clone(), def.kind, full_source.to_string())
                .with_file_path(file_path.clone())
                .with_line_range(span.start_line, span.end_line)
                .with_metadata(semantic_metadata);
            impl_chunks.push((chunk, calls_to_relation_source(name, calls)));
        }

        // Calls relations: only when the callee is a known entity name
        // (union of entities produced so far and the globally supplied
        // set), preventing orphan `calls` (§4.1.1, §9).
        let mut final_impl_chunks = Vec::with_capacity(impl_chunks.len());
        for (chunk, (from, calls)) in impl_chunks {
            for callee in calls {
                if local_known.contains(&callee) {
                    relations.push(Relation::new(from.clone(), callee, RelationType::Calls));
                }
            }
            final_impl_chunks.push(chunk);
        }

        // `contains` relations for every file->non-file entity (§3
        // invariant 1), emitted after all entities from the file are known.
        for entity in entities.iter().skip(1) {
            relations.push(Relation::new(file_path.clone(), entity.name(), RelationType::Contains));
        }

        // File-operation imports (regex pass over raw source).
        relations.extend(self.extract_file_operations(content, &file_path));

        if let Some(sink) = batch_sink.as_deref_mut() {
            sink.accept(entities.clone(), relations.clone(), final_impl_chunks.clone());
        }

        result.entities = entities;
        result.relations = relations;
        result.implementation_chunks = final_impl_chunks;
        result.parse_duration = start.elapsed();
        result
    }
}

fn calls_to_relation_source(name: String, calls: Vec<String>) -> (String, Vec<String>) {
    (name, calls)
}

/// Extracts callee names from call expressions, with function-definition
/// lines removed first (§4.1.1: "extracted call names (regex over source
/// with function-definition lines removed)").
fn extract_call_names(source: &str) -> Vec<String> {
    let without_def_lines: String = source
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with("def ") && !trimmed.starts_with("class ") && !trimmed.starts_with("async def ")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let call_re = Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("static regex compiles");
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for capture in call_re.captures_iter(&without_def_lines) {
        if let Some(m) = capture.get(1) {
            let name = m.as_str().to_string();
            if !is_python_keyword(&name) && seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    names
}

fn is_python_keyword(name: &str) -> bool {
    matches!(
        name,
        "if" | "for" | "while" | "with" | "except" | "elif" | "return" | "print" | "super" | "lambda"
    )
}

/// `module.attr`-shaped references (§4.1.1).
fn extract_attribute_refs(source: &str) -> Vec<String> {
    let re = Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*)\b").expect("static regex compiles");
    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    for capture in re.captures_iter(source) {
        if let Some(m) = capture.get(1) {
            let name = m.as_str().to_string();
            if seen.insert(name.clone()) {
                refs.push(name);
            }
        }
    }
    refs
}

fn extract_exception_names(source: &str) -> Vec<String> {
    let re = Regex::new(r"except\s+([A-Za-z_][A-Za-z0-9_.]*)").expect("static regex compiles");
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for capture in re.captures_iter(source) {
        if let Some(m) = capture.get(1) {
            let name = m.as_str().to_string();
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    names
}

/// 1 + count of control-flow keywords {if, elif, for, while, try, except,
/// with} (§4.1.1's crude cyclomatic complexity).
fn count_control_flow_keywords(source: &str) -> usize {
    let mut count = 0;
    for word in source.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if CONTROL_FLOW_KEYWORDS.contains(&word) {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParserResult {
        let parser = PythonParser::new();
        parser.parse(Path::new("foo.py"), content, &HashSet::new(), None)
    }

    #[test]
    fn test_function_entity_extraction() {
        let result = parse("def add(a, b):\n    return a + b\n");
        let names: Vec<&str> = result.entities.iter().map(|e| e.name()).collect();
        assert!(names.contains(&"add"));
        assert!(names.contains(&"foo.py"));
    }

    #[test]
    fn test_class_with_bases_emits_inherits() {
        let result = parse("class Bar(Base):\n    pass\n");
        let has_inherits = result
            .relations
            .iter()
            .any(|r| r.relation_type == RelationType::Inherits && r.from_entity == "Bar" && r.to_entity == "Base");
        assert!(has_inherits);
    }

    #[test]
    fn test_file_contains_relations_emitted() {
        let result = parse("def add(a, b):\n    return a + b\n");
        let has_contains = result
            .relations
            .iter()
            .any(|r| r.relation_type == RelationType::Contains && r.to_entity == "add");
        assert!(has_contains);
    }

    #[test]
    fn test_file_open_relation_with_import_type() {
        let result = parse("def help():\n    open(\"data.json\", \"r\")\n");
        let has_file_open = result.relations.iter().any(|r| {
            r.relation_type == RelationType::Imports
                && r.to_entity == "data.json"
                && r.import_type() == Some("file_open")
        });
        assert!(has_file_open);
    }

    #[test]
    fn test_empty_file_produces_only_file_entity() {
        let result = parse("");
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].entity_type(), EntityType::File);
        assert!(result.relations.is_empty());
    }

    #[test]
    fn test_module_level_variable_extracted() {
        let result = parse("x = 1\n");
        let names: Vec<&str> = result.entities.iter().map(|e| e.name()).collect();
        assert!(names.contains(&"x"));
    }

    #[test]
    fn test_implementation_chunk_has_complexity_metadata() {
        let result = parse("def foo():\n    if True:\n        pass\n");
        assert_eq!(result.implementation_chunks.len(), 1);
    }

    #[test]
    fn test_calls_relation_only_for_known_entities() {
        let result = parse("def a():\n    pass\n\ndef b():\n    a()\n    unknown_fn()\n");
        let has_known_call = result
            .relations
            .iter()
            .any(|r| r.relation_type == RelationType::Calls && r.from_entity == "b" && r.to_entity == "a");
        let has_unknown_call = result
            .relations
            .iter()
            .any(|r| r.relation_type == RelationType::Calls && r.to_entity == "unknown_fn");
        assert!(has_known_call);
        assert!(!has_unknown_call);
    }
}
