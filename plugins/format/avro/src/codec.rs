use std::sync::Arc;

use apache_avro::Schema;
use avrobind_engine::ConvertOptions;
use avrobind_types::{HostType, HostValue};

use crate::config::CodecConfig;
use crate::error::AvroError;

// ═══════════════════════════════════════════════════════════════
//  AvroCodec
// ═══════════════════════════════════════════════════════════════

/// Encodes host values to Avro binary and back under one schema.
///
/// The schema is parsed once and shared; a codec can be cloned or used from
/// several threads at once.
#[derive(Debug, Clone)]
pub struct AvroCodec {
    schema: Arc<Schema>,
    options: ConvertOptions,
}

impl AvroCodec {
    pub fn new(schema_json: &str) -> Result<Self, AvroError> {
        let schema = Schema::parse_str(schema_json)
            .map_err(|e| AvroError::Config(format!("failed to parse schema: {e}")))?;
        Ok(Self {
            schema: Arc::new(schema),
            options: ConvertOptions::default(),
        })
    }

    pub fn from_config(config: &CodecConfig) -> Result<Self, AvroError> {
        let codec = Self::new(&config.schema_json()?)?.with_options(config.options.clone());
        tracing::debug!(
            schema_path = ?config.schema_path,
            union_fallback = ?codec.options.union_fallback,
            "avro codec created"
        );
        Ok(codec)
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn to_avro(&self, value: &HostValue) -> Result<Vec<u8>, AvroError> {
        let generic = avrobind_engine::serialize(&self.schema, value).map_err(AvroError::serialization)?;
        let bytes = apache_avro::to_avro_datum(&self.schema, generic).map_err(AvroError::serialization)?;
        tracing::debug!(bytes = bytes.len(), "avro encode");
        Ok(bytes)
    }

    pub fn from_avro(&self, data: &[u8], ty: &HostType) -> Result<HostValue, AvroError> {
        let mut reader = data;
        let generic = apache_avro::from_avro_datum(&self.schema, &mut reader, None)
            .map_err(AvroError::deserialization)?;
        tracing::debug!(bytes = data.len() - reader.len(), "avro decode");
        avrobind_engine::deserialize_with(&self.schema, ty, &generic, &self.options)
            .map_err(AvroError::deserialization)
    }
}
