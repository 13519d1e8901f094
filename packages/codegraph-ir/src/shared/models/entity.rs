//! Entity model (spec §3 "Entities").
//!
//! An `Entity` is a named, typed record extracted from a source file.
//! Identity for storage purposes is `(file_path, name, entity_type)`;
//! entities are immutable once built.

use serde_json::Value;

/// The kind of thing an `Entity` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    File,
    Function,
    Class,
    Variable,
    Import,
    Documentation,
    TextChunk,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::File => "file",
            EntityType::Function => "function",
            EntityType::Class => "class",
            EntityType::Variable => "variable",
            EntityType::Import => "import",
            EntityType::Documentation => "documentation",
            EntityType::TextChunk => "text_chunk",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, typed record extracted from a source file.
///
/// Built via [`EntityBuilder`]; once constructed an `Entity` exposes no
/// mutators, matching the teacher's immutable-snapshot convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    name: String,
    entity_type: EntityType,
    observations: Vec<String>,
    file_path: Option<String>,
    line_number: Option<u32>,
    end_line_number: Option<u32>,
    docstring: Option<String>,
    signature: Option<String>,
    metadata: Option<Value>,
}

impl Entity {
    pub fn builder(name: impl Into<String>, entity_type: EntityType) -> EntityBuilder {
        EntityBuilder::new(name, entity_type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn observations(&self) -> &[String] {
        &self.observations
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    pub fn line_number(&self) -> Option<u32> {
        self.line_number
    }

    pub fn end_line_number(&self) -> Option<u32> {
        self.end_line_number
    }

    pub fn docstring(&self) -> Option<&str> {
        self.docstring.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// Storage identity: `(file_path, name, entity_type)`.
    pub fn identity(&self) -> (Option<&str>, &str, EntityType) {
        (self.file_path(), &self.name, self.entity_type)
    }
}

/// Builder for [`Entity`]; the only way to construct one.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    name: String,
    entity_type: EntityType,
    observations: Vec<String>,
    file_path: Option<String>,
    line_number: Option<u32>,
    end_line_number: Option<u32>,
    docstring: Option<String>,
    signature: Option<String>,
    metadata: Option<Value>,
}

impl EntityBuilder {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            observations: Vec::new(),
            file_path: None,
            line_number: None,
            end_line_number: None,
            docstring: None,
            signature: None,
            metadata: None,
        }
    }

    pub fn observation(mut self, observation: impl Into<String>) -> Self {
        self.observations.push(observation.into());
        self
    }

    pub fn observations(mut self, observations: Vec<String>) -> Self {
        self.observations = observations;
        self
    }

    pub fn file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn line_range(mut self, start: u32, end: u32) -> Self {
        self.line_number = Some(start);
        self.end_line_number = Some(end);
        self
    }

    pub fn docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn build(self) -> Entity {
        Entity {
            name: self.name,
            entity_type: self.entity_type,
            observations: self.observations,
            file_path: self.file_path,
            line_number: self.line_number,
            end_line_number: self.end_line_number,
            docstring: self.docstring,
            signature: self.signature,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_roundtrip() {
        let entity = Entity::builder("login", EntityType::Function)
            .file_path("src/auth.py")
            .line_range(10, 20)
            .observation("handles user authentication")
            .signature("def login(user, password)")
            .build();

        assert_eq!(entity.name(), "login");
        assert_eq!(entity.entity_type(), EntityType::Function);
        assert_eq!(entity.file_path(), Some("src/auth.py"));
        assert_eq!(entity.line_number(), Some(10));
        assert_eq!(entity.end_line_number(), Some(20));
        assert_eq!(entity.observations().len(), 1);
    }

    #[test]
    fn test_identity() {
        let entity = Entity::builder("User", EntityType::Class)
            .file_path("src/models.py")
            .build();
        assert_eq!(
            entity.identity(),
            (Some("src/models.py"), "User", EntityType::Class)
        );
    }

    #[test]
    fn test_entity_type_display() {
        assert_eq!(EntityType::TextChunk.as_str(), "text_chunk");
        assert_eq!(EntityType::Function.to_string(), "function");
    }
}
