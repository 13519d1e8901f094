//! Config file loading (YAML/JSON) with unknown-key warnings.

use super::error::ConfigResult;
use super::model::Config;
use std::path::Path;

/// Top-level field names `Config` recognizes; anything else in a loaded
/// file is logged as a warning, not a hard failure.
const KNOWN_FIELDS: &[&str] = &[
    "openai_api_key",
    "voyage_api_key",
    "qdrant_url",
    "qdrant_api_key",
    "collection_name",
    "embedding_provider",
    "batch_size",
    "max_file_size",
    "include_patterns",
    "exclude_patterns",
    "debounce_seconds",
    "cleanup_interval_minutes",
    "state_directory",
];

fn warn_unknown_keys(value: &serde_json::Value) {
    let Some(map) = value.as_object() else {
        return;
    };
    for key in map.keys() {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            tracing::warn!(field = %key, "unknown configuration key ignored");
        }
    }
}

impl Config {
    pub fn load_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let as_value: serde_yaml::Value = serde_yaml::from_str(&raw)?;
        let as_json: serde_json::Value = serde_json::to_value(&as_value)?;
        warn_unknown_keys(&as_json);
        let config: Config = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    pub fn load_json(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let as_value: serde_json::Value = serde_json::from_str(&raw)?;
        warn_unknown_keys(&as_value);
        let config: Config = serde_json::from_value(as_value)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_yaml_with_known_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "batch_size: 25\ndebounce_seconds: 1.5").unwrap();
        let config = Config::load_yaml(file.path()).unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.debounce_seconds, 1.5);
        // Unspecified fields keep their defaults.
        assert_eq!(config.collection_name, "default");
    }

    #[test]
    fn test_load_yaml_unknown_field_does_not_fail() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "batch_size: 10\nsome_future_option: true").unwrap();
        let config = Config::load_yaml(file.path());
        assert!(config.is_ok());
        assert_eq!(config.unwrap().batch_size, 10);
    }

    #[test]
    fn test_load_json_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"collection_name": "my-project", "max_file_size": 2048}}"#).unwrap();
        let config = Config::load_json(file.path()).unwrap();
        assert_eq!(config.collection_name, "my-project");
        assert_eq!(config.max_file_size, 2048);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = Config::load_yaml("/nonexistent/path/config.yaml");
        assert!(result.is_err());
    }
}
