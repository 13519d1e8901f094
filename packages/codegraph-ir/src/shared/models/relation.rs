//! Relation model (spec §3 "Relations").
//!
//! A `Relation` is a typed directed edge `(from_entity, to_entity,
//! relation_type)` between two entity names.

use serde_json::Value;

/// Kind of edge between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Contains,
    Inherits,
    Imports,
    Calls,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Contains => "contains",
            RelationType::Inherits => "inherits",
            RelationType::Imports => "imports",
            RelationType::Calls => "calls",
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge between two entity names.
///
/// For `relation_type = imports` with a file-operation target, `metadata`
/// carries an `import_type` tag (e.g. `file_open`, `json_load`,
/// `pandas_csv_write`) that participates in the relation's canonical ID so
/// that distinct file-operation kinds between the same endpoints don't
/// collapse into one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub from_entity: String,
    pub to_entity: String,
    pub relation_type: RelationType,
    pub context: Option<String>,
    pub confidence: f32,
    pub metadata: Option<Value>,
}

impl Relation {
    pub fn new(
        from_entity: impl Into<String>,
        to_entity: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            relation_type,
            context: None,
            confidence: 1.0,
            metadata: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_import_type(mut self, import_type: impl Into<String>) -> Self {
        let mut metadata = self.metadata.take().unwrap_or_else(|| serde_json::json!({}));
        if let Value::Object(ref mut map) = metadata {
            map.insert("import_type".to_string(), Value::String(import_type.into()));
        }
        self.metadata = Some(metadata);
        self
    }

    /// The `import_type` tag, if this relation's metadata carries one.
    pub fn import_type(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("import_type"))
            .and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_defaults() {
        let rel = Relation::new("src/main.py", "src/utils.py", RelationType::Imports);
        assert_eq!(rel.confidence, 1.0);
        assert!(rel.context.is_none());
        assert!(rel.import_type().is_none());
    }

    #[test]
    fn test_relation_with_import_type() {
        let rel = Relation::new("src/main.py", "data.json", RelationType::Imports)
            .with_import_type("json_load");
        assert_eq!(rel.import_type(), Some("json_load"));
    }

    #[test]
    fn test_relation_type_display() {
        assert_eq!(RelationType::Calls.as_str(), "calls");
        assert_eq!(RelationType::Contains.to_string(), "contains");
    }
}
