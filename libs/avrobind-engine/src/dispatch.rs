//! Schema-tag dispatch for both directions.
//!
//! The factories pick the converter for a schema node so that visitors can
//! recurse into nested values without matching on the schema themselves.

use apache_avro::Schema;
use apache_avro::schema::{ArraySchema, EnumSchema, FixedSchema, MapSchema, RecordSchema, UnionSchema};
use apache_avro::types::Value;
use avrobind_types::{HostType, HostValue};

use crate::de::DeserializeVisitor;
use crate::error::Result;
use crate::schema::{SchemaKind, SchemaNames};
use crate::ser::SerializeVisitor;

/// Converter from a generic value to a host value, chosen from a
/// (schema, target type) pair.
#[derive(Debug, Clone, Copy)]
pub enum Deserializer<'s, 't> {
    Null,
    String,
    Double,
    Integer,
    Bytes,
    /// Booleans and anything else that passes through unchanged.
    Generic,
    Array {
        schema: &'s ArraySchema,
        ty: &'t HostType,
    },
    Map {
        schema: &'s MapSchema,
        ty: &'t HostType,
    },
    Record {
        schema: &'s RecordSchema,
        ty: &'t HostType,
    },
    Union {
        schema: &'s UnionSchema,
        ty: &'t HostType,
    },
}

impl<'s, 't> Deserializer<'s, 't> {
    pub fn for_schema(names: &SchemaNames<'s>, schema: &'s Schema, ty: &'t HostType) -> Result<Self> {
        let schema = names.resolve(schema)?;
        let deserializer = match (SchemaKind::of(schema)?, schema) {
            (SchemaKind::Null, _) => Deserializer::Null,
            (SchemaKind::String | SchemaKind::Enum, _) => Deserializer::String,
            (SchemaKind::Float | SchemaKind::Double, _) => Deserializer::Double,
            (SchemaKind::Int | SchemaKind::Long, _) => Deserializer::Integer,
            (SchemaKind::Bytes | SchemaKind::Fixed, _) => Deserializer::Bytes,
            (_, Schema::Array(schema)) => Deserializer::Array { schema, ty },
            (_, Schema::Map(schema)) => Deserializer::Map { schema, ty },
            (_, Schema::Record(schema)) => Deserializer::Record { schema, ty },
            (_, Schema::Union(schema)) => Deserializer::Union { schema, ty },
            _ => Deserializer::Generic,
        };
        Ok(deserializer)
    }

    pub fn deserialize(&self, visitor: &DeserializeVisitor<'s>, value: &Value) -> Result<HostValue> {
        match *self {
            Deserializer::Null => visitor.visit_null(value),
            Deserializer::String => visitor.visit_string(value),
            Deserializer::Double => visitor.visit_double(value),
            Deserializer::Integer => visitor.visit_integer(value),
            Deserializer::Bytes => visitor.visit_bytes(value),
            Deserializer::Generic => visitor.visit_generic(value),
            Deserializer::Array { schema, ty } => visitor.visit_array(schema, ty, value),
            Deserializer::Map { schema, ty } => visitor.visit_map(schema, ty, value),
            Deserializer::Record { schema, ty } => visitor.visit_record(schema, ty, value),
            Deserializer::Union { schema, ty } => visitor.visit_top_level_union(schema, ty, value),
        }
    }
}

/// Converter from a host value to a generic value, chosen from the schema
/// alone.
#[derive(Debug, Clone, Copy)]
pub enum Serializer<'s> {
    Null,
    String(&'s Schema),
    Enum(&'s EnumSchema),
    Fixed(&'s FixedSchema),
    Array(&'s ArraySchema),
    Map(&'s MapSchema),
    Record(&'s RecordSchema),
    Union(&'s UnionSchema),
    /// Numbers, booleans and bytes, including logical types carried by them.
    Primitive(&'s Schema),
}

impl<'s> Serializer<'s> {
    pub fn for_schema(names: &SchemaNames<'s>, schema: &'s Schema) -> Result<Self> {
        let schema = names.resolve(schema)?;
        let serializer = match (SchemaKind::of(schema)?, schema) {
            (SchemaKind::Null, _) => Serializer::Null,
            (SchemaKind::String, _) => Serializer::String(schema),
            (_, Schema::Enum(schema)) => Serializer::Enum(schema),
            (_, Schema::Fixed(schema)) => Serializer::Fixed(schema),
            (_, Schema::Array(schema)) => Serializer::Array(schema),
            (_, Schema::Map(schema)) => Serializer::Map(schema),
            (_, Schema::Record(schema)) => Serializer::Record(schema),
            (_, Schema::Union(schema)) => Serializer::Union(schema),
            _ => Serializer::Primitive(schema),
        };
        Ok(serializer)
    }

    pub fn serialize(&self, visitor: &SerializeVisitor<'s>, value: &HostValue) -> Result<Value> {
        match *self {
            Serializer::Null => visitor.visit_null(value),
            Serializer::String(schema) => visitor.visit_string(schema, value),
            Serializer::Enum(schema) => visitor.visit_enum(schema, value),
            Serializer::Fixed(schema) => visitor.visit_fixed(schema, value),
            Serializer::Array(schema) => visitor.visit_array(schema, value),
            Serializer::Map(schema) => visitor.visit_map(schema, value),
            Serializer::Record(schema) => visitor.visit_record(schema, value),
            Serializer::Union(schema) => visitor.visit_union(schema, value),
            Serializer::Primitive(schema) => visitor.visit_primitive(schema, value),
        }
    }
}
