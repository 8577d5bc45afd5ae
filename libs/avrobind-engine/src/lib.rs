//! Schema-driven conversion between Avro generic values and host values.
//!
//! [`deserialize`] walks a schema and a decoded generic value together and
//! realizes a [`HostValue`] shaped by a target [`HostType`]. [`serialize`] is
//! the mirror direction and produces a generic value ready for the encoder.
//! Both are pure functions of their inputs and hold no state across calls.

pub mod config;
pub mod de;
pub mod dispatch;
pub mod error;
pub mod reconcile;
pub mod schema;
pub mod ser;

use apache_avro::Schema;
use apache_avro::types::Value;
use avrobind_types::{HostType, HostValue};

pub use config::{ConvertOptions, UnionFallback};
pub use de::DeserializeVisitor;
pub use dispatch::{Deserializer, Serializer};
pub use error::{ConversionError, ErrorKind, Result};
pub use reconcile::{find_nested_map_type, find_nested_record_type, unwrap_qualifiers};
pub use schema::{SchemaKind, SchemaNames};
pub use ser::SerializeVisitor;

/// Convert a generic value into a host value of type `ty`, with default
/// options.
pub fn deserialize(schema: &Schema, ty: &HostType, value: &Value) -> Result<HostValue> {
    deserialize_with(schema, ty, value, &ConvertOptions::default())
}

pub fn deserialize_with(
    schema: &Schema,
    ty: &HostType,
    value: &Value,
    options: &ConvertOptions,
) -> Result<HostValue> {
    tracing::trace!(schema = %schema_kind(schema), target = %ty.tag(), "deserialize");
    DeserializeVisitor::new(schema, options.clone()).deserialize(schema, ty, value)
}

/// Convert a host value into a generic value conforming to `schema`.
pub fn serialize(schema: &Schema, value: &HostValue) -> Result<Value> {
    tracing::trace!(schema = %schema_kind(schema), kind = %value.kind(), "serialize");
    SerializeVisitor::new(schema).serialize(schema, value)
}

fn schema_kind(schema: &Schema) -> String {
    SchemaKind::of(schema)
        .map(|k| k.to_string())
        .unwrap_or_else(|_| "unsupported".to_string())
}
