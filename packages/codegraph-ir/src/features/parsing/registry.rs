//! `ParserRegistry` (spec §4.1): an ordered list of parsers, first
//! `can_parse` match wins.

use std::path::Path;

use super::ports::{BatchSink, LanguageParser, ParserResult};

pub struct ParserRegistry {
    parsers: Vec<Box<dyn LanguageParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self { parsers: Vec::new() }
    }

    pub fn register(mut self, parser: Box<dyn LanguageParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn find(&self, path: &Path) -> Option<&dyn LanguageParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(path))
            .map(|b| b.as_ref())
    }

    pub fn parse(
        &self,
        path: &Path,
        content: &str,
        known_entity_names: &std::collections::HashSet<String>,
        batch_sink: Option<&mut dyn BatchSink>,
    ) -> Option<ParserResult> {
        self.find(path)
            .map(|parser| parser.parse(path, content, known_entity_names, batch_sink))
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::parsing::python::PythonParser;
    use crate::features::parsing::text::TextWindowParser;

    #[test]
    fn test_first_matching_parser_wins() {
        let registry = ParserRegistry::new()
            .register(Box::new(PythonParser::new()))
            .register(Box::new(TextWindowParser::new()));

        let found = registry.find(Path::new("a.py"));
        assert!(found.is_some());
    }

    #[test]
    fn test_no_parser_for_unknown_extension() {
        let registry = ParserRegistry::new().register(Box::new(PythonParser::new()));
        assert!(registry.find(Path::new("a.unknownext")).is_none());
    }
}
