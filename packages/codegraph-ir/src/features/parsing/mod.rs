//! Source parsing (spec §4.1): a registry of per-language/file-kind
//! parsers producing entities, relations, and implementation chunks.

pub mod documentation;
pub mod ports;
pub mod python;
pub mod registry;
pub mod text;

pub use documentation::MarkdownParser;
pub use ports::{BatchSink, LanguageParser, ParserResult};
pub use python::PythonParser;
pub use registry::ParserRegistry;
pub use text::{CsvParser, IniParser, TextWindowParser};

/// Builds the default registry covering every parser this crate ships,
/// in the order the orchestrator (C7) uses them (spec §4.1: first match
/// wins, so the most specific extensions should be registered first).
pub fn default_registry() -> ParserRegistry {
    ParserRegistry::new()
        .register(Box::new(PythonParser::new()))
        .register(Box::new(MarkdownParser::new()))
        .register(Box::new(CsvParser::new()))
        .register(Box::new(IniParser::new()))
        .register(Box::new(TextWindowParser::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_registry_covers_all_extensions() {
        let registry = default_registry();
        assert!(registry.find(Path::new("a.py")).is_some());
        assert!(registry.find(Path::new("a.md")).is_some());
        assert!(registry.find(Path::new("a.csv")).is_some());
        assert!(registry.find(Path::new("a.ini")).is_some());
        assert!(registry.find(Path::new("a.txt")).is_some());
        assert!(registry.find(Path::new("a.rs")).is_none());
    }
}
