use std::path::Path;

use avrobind_engine::ConvertOptions;
use serde::Deserialize;

use crate::error::AvroError;

/// Codec configuration, usually read from a TOML file:
///
/// ```toml
/// schema_path = "schemas/person.avsc"
///
/// [options]
/// union_fallback = "nil"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Path to an Avro schema file (.avsc).
    pub schema_path: Option<String>,
    /// Inline schema JSON.
    pub schema: Option<String>,
    pub options: ConvertOptions,
}

impl CodecConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AvroError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AvroError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| e.with_context(path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, AvroError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| AvroError::Config(e.to_string()))?;
        match (&config.schema_path, &config.schema) {
            (Some(_), None) | (None, Some(_)) => Ok(config),
            (Some(_), Some(_)) => Err(AvroError::Config(
                "schema_path and schema are mutually exclusive".into(),
            )),
            (None, None) => Err(AvroError::Config(
                "one of schema_path or schema is required".into(),
            )),
        }
    }

    /// Schema JSON, read from `schema_path` or taken inline.
    pub fn schema_json(&self) -> Result<String, AvroError> {
        match (&self.schema_path, &self.schema) {
            (_, Some(inline)) => Ok(inline.clone()),
            (Some(path), None) => std::fs::read_to_string(path)
                .map_err(|e| AvroError::Config(format!("failed to read schema file '{path}': {e}"))),
            (None, None) => Err(AvroError::Config(
                "one of schema_path or schema is required".into(),
            )),
        }
    }
}
