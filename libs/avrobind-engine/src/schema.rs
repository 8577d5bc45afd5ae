use std::collections::HashMap;
use std::fmt;

use apache_avro::Schema;
use apache_avro::schema::{Name, UnionSchema};

use crate::error::{ConversionError, Result};

/// Structural tag of a schema node, with logical types folded onto the
/// primitive that carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Enum,
    Fixed,
    Array,
    Map,
    Union,
    Record,
}

impl SchemaKind {
    /// Tag of an already resolved schema node.
    pub fn of(schema: &Schema) -> Result<Self> {
        let kind = match schema {
            Schema::Null => SchemaKind::Null,
            Schema::Boolean => SchemaKind::Boolean,
            Schema::Int | Schema::Date | Schema::TimeMillis => SchemaKind::Int,
            Schema::Long
            | Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::TimestampNanos
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros
            | Schema::LocalTimestampNanos => SchemaKind::Long,
            Schema::Float => SchemaKind::Float,
            Schema::Double => SchemaKind::Double,
            Schema::Bytes => SchemaKind::Bytes,
            Schema::String | Schema::Uuid => SchemaKind::String,
            Schema::Enum(_) => SchemaKind::Enum,
            Schema::Fixed(_) => SchemaKind::Fixed,
            Schema::Array(_) => SchemaKind::Array,
            Schema::Map(_) => SchemaKind::Map,
            Schema::Union(_) => SchemaKind::Union,
            Schema::Record(_) => SchemaKind::Record,
            Schema::Ref { name } => {
                return Err(ConversionError::unsupported(format!(
                    "unresolved reference to '{}'",
                    fullname(name)
                )));
            }
            other => {
                return Err(ConversionError::unsupported(format!(
                    "schema '{}' is not supported",
                    canonical_name(other)
                )));
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::Bytes => "bytes",
            SchemaKind::String => "string",
            SchemaKind::Enum => "enum",
            SchemaKind::Fixed => "fixed",
            SchemaKind::Array => "array",
            SchemaKind::Map => "map",
            SchemaKind::Union => "union",
            SchemaKind::Record => "record",
        };
        f.write_str(s)
    }
}

fn canonical_name(schema: &Schema) -> String {
    schema.canonical_form()
}

/// `namespace.name`, or the bare name without a namespace.
pub(crate) fn fullname(name: &Name) -> String {
    match &name.namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}.{}", name.name),
        _ => name.name.clone(),
    }
}

/// Short name of a union branch: the type name for named types, the
/// carrier kind otherwise.
pub(crate) fn describe_branch(schema: &Schema) -> String {
    match schema {
        Schema::Record(r) => r.name.name.clone(),
        Schema::Enum(e) => e.name.name.clone(),
        Schema::Fixed(f) => f.name.name.clone(),
        Schema::Ref { name } => name.name.clone(),
        other => SchemaKind::of(other)
            .map(|k| k.to_string())
            .unwrap_or_else(|_| canonical_name(other)),
    }
}

/// Human-readable list of union branches, e.g. `[null, string, Person]`.
pub(crate) fn describe_union(union: &UnionSchema) -> String {
    let names: Vec<String> = union.variants().iter().map(describe_branch).collect();
    format!("[{}]", names.join(", "))
}

/// Named types reachable from a root schema, used to follow `Ref` nodes.
///
/// Built once per conversion from the root and shared by reference; schema
/// trees are never copied.
#[derive(Debug, Default)]
pub struct SchemaNames<'s> {
    by_name: HashMap<String, &'s Schema>,
}

impl<'s> SchemaNames<'s> {
    pub fn new(root: &'s Schema) -> Self {
        let mut names = Self::default();
        names.collect(root);
        names
    }

    fn collect(&mut self, schema: &'s Schema) {
        match schema {
            Schema::Record(record) => {
                if self.by_name.insert(fullname(&record.name), schema).is_some() {
                    return;
                }
                for field in &record.fields {
                    self.collect(&field.schema);
                }
            }
            Schema::Enum(e) => {
                self.by_name.insert(fullname(&e.name), schema);
            }
            Schema::Fixed(f) => {
                self.by_name.insert(fullname(&f.name), schema);
            }
            Schema::Array(array) => self.collect(&array.items),
            Schema::Map(map) => self.collect(&map.types),
            Schema::Union(union) => {
                for variant in union.variants() {
                    self.collect(variant);
                }
            }
            _ => {}
        }
    }

    /// Follow a `Ref` to its definition; any other node is returned as-is.
    pub fn resolve(&self, schema: &'s Schema) -> Result<&'s Schema> {
        match schema {
            Schema::Ref { name } => {
                let key = fullname(name);
                self.by_name.get(&key).copied().ok_or_else(|| {
                    ConversionError::unsupported(format!("unknown named type '{key}'"))
                })
            }
            other => Ok(other),
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
