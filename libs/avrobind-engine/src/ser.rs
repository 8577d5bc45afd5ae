use std::collections::HashMap;
use std::fmt;

use apache_avro::Schema;
use apache_avro::schema::{ArraySchema, EnumSchema, FixedSchema, MapSchema, RecordSchema, UnionSchema};
use apache_avro::types::Value;
use avrobind_types::{HostValue, MapValue, RecordValue};

use crate::dispatch::Serializer;
use crate::error::{ConversionError, Result};
use crate::schema::{SchemaKind, SchemaNames, describe_union};

static NIL: HostValue = HostValue::Nil;

fn unexpected(expected: impl fmt::Display, found: &HostValue) -> ConversionError {
    ConversionError::schema_mismatch(format!("expected {expected} value, found {}", found.kind()))
}

/// Two's-complement truncation to 32 bits.
fn truncate_to_int(i: i64) -> i32 {
    i as i32
}

/// Rule matching schemas whose carrier kind is `kind`. Unsupported schemas
/// never match.
fn kind_is(kind: SchemaKind) -> impl Fn(&Schema) -> bool {
    move |s: &Schema| SchemaKind::of(s).is_ok_and(|k| k == kind)
}

/// A union branch and the path of branch indices leading to it. Nested
/// unions contribute one index per level.
#[derive(Debug)]
struct Branch<'s> {
    path: Vec<u32>,
    schema: &'s Schema,
}

/// Host fields read by name, from either a record or a map.
enum Fields<'v> {
    Record(&'v RecordValue),
    Map(&'v MapValue),
}

impl<'v> Fields<'v> {
    fn of(value: &'v HostValue) -> Option<Self> {
        match value {
            HostValue::Record(record) => Some(Fields::Record(record)),
            HostValue::Map(map) => Some(Fields::Map(map)),
            _ => None,
        }
    }

    fn get(&self, name: &str) -> Option<&'v HostValue> {
        match self {
            Fields::Record(record) => record.get(name),
            Fields::Map(map) => map.get(name),
        }
    }

    fn entries(&self) -> Vec<(&'v str, &'v HostValue)> {
        match self {
            Fields::Record(record) => record.iter().collect(),
            Fields::Map(map) => map.iter().collect(),
        }
    }
}

/// Walks a host value under a schema, producing the generic value the
/// encoder consumes.
pub struct SerializeVisitor<'s> {
    names: SchemaNames<'s>,
}

impl<'s> SerializeVisitor<'s> {
    pub fn new(root: &'s Schema) -> Self {
        Self {
            names: SchemaNames::new(root),
        }
    }

    pub fn serialize(&self, schema: &'s Schema, value: &HostValue) -> Result<Value> {
        Serializer::for_schema(&self.names, schema)?.serialize(self, value)
    }

    pub fn visit_null(&self, value: &HostValue) -> Result<Value> {
        if value.is_nil() {
            Ok(Value::Null)
        } else {
            Err(ConversionError::schema_mismatch(format!(
                "value of kind {} does not match the null schema",
                value.kind()
            )))
        }
    }

    pub fn visit_string(&self, schema: &'s Schema, value: &HostValue) -> Result<Value> {
        let HostValue::String(s) = value else {
            return Err(unexpected("string", value));
        };
        match schema {
            Schema::Uuid => Value::String(s.clone())
                .resolve(schema)
                .map_err(|e| ConversionError::schema_mismatch(format!("invalid uuid '{s}': {e}"))),
            _ => Ok(Value::String(s.clone())),
        }
    }

    pub fn visit_enum(&self, schema: &'s EnumSchema, value: &HostValue) -> Result<Value> {
        let HostValue::String(symbol) = value else {
            return Err(unexpected("string", value));
        };
        let index = schema
            .symbols
            .iter()
            .position(|s| s == symbol)
            .ok_or_else(|| {
                ConversionError::schema_mismatch(format!(
                    "'{symbol}' is not a symbol of enum '{}'",
                    schema.name.name
                ))
            })?;
        Ok(Value::Enum(index as u32, symbol.clone()))
    }

    /// The payload length is not checked against the declared size; the
    /// encoder rejects a mismatch.
    pub fn visit_fixed(&self, _schema: &'s FixedSchema, value: &HostValue) -> Result<Value> {
        let HostValue::Bytes(bytes) = value else {
            return Err(unexpected("bytes", value));
        };
        Ok(Value::Fixed(bytes.len(), bytes.clone()))
    }

    pub fn visit_array(&self, schema: &'s ArraySchema, value: &HostValue) -> Result<Value> {
        let HostValue::Array(array) = value else {
            return Err(unexpected("array", value));
        };
        let element = Serializer::for_schema(&self.names, &schema.items)?;
        let items = array
            .iter()
            .enumerate()
            .map(|(i, item)| {
                element
                    .serialize(self, item)
                    .map_err(|e| e.with_context(format!("[{i}]")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    pub fn visit_map(&self, schema: &'s MapSchema, value: &HostValue) -> Result<Value> {
        let fields = Fields::of(value).ok_or_else(|| unexpected("map", value))?;
        let element = Serializer::for_schema(&self.names, &schema.types)?;
        let entries = fields.entries();
        let mut map = HashMap::with_capacity(entries.len());
        for (key, item) in entries {
            let converted = element
                .serialize(self, item)
                .map_err(|e| e.with_context(format!("key '{key}'")))?;
            map.insert(key.to_string(), converted);
        }
        Ok(Value::Map(map))
    }

    /// Fields are emitted in schema order. A field missing from the host
    /// value is serialized as nil.
    pub fn visit_record(&self, schema: &'s RecordSchema, value: &HostValue) -> Result<Value> {
        let fields = Fields::of(value).ok_or_else(|| unexpected("record", value))?;
        let mut out = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let item = fields.get(&field.name).unwrap_or(&NIL);
            let converted = self
                .serialize(&field.schema, item)
                .map_err(|e| e.with_context(format!("field '{}'", field.name)))?;
            out.push((field.name.clone(), converted));
        }
        Ok(Value::Record(out))
    }

    pub fn visit_union(&self, schema: &'s UnionSchema, value: &HostValue) -> Result<Value> {
        let branch = self.select_branch(schema, value)?.ok_or_else(|| {
            ConversionError::schema_mismatch(format!(
                "no branch of union {} accepts a value of kind '{}'",
                describe_union(schema),
                value.kind()
            ))
        })?;
        tracing::debug!(path = ?branch.path, kind = %value.kind(), "union branch selected");

        let inner = self.serialize(branch.schema, value)?;
        Ok(branch
            .path
            .iter()
            .rev()
            .fold(inner, |acc, &index| Value::Union(index, Box::new(acc))))
    }

    /// Numbers, booleans and bytes. Host integers narrow to 32 bits by
    /// truncation under `int` schemas.
    pub fn visit_primitive(&self, schema: &'s Schema, value: &HostValue) -> Result<Value> {
        let converted = match (schema, value) {
            (Schema::Boolean, HostValue::Boolean(b)) => Value::Boolean(*b),
            (Schema::Int, HostValue::Int(i)) => Value::Int(truncate_to_int(*i)),
            (Schema::Date, HostValue::Int(i)) => Value::Date(truncate_to_int(*i)),
            (Schema::TimeMillis, HostValue::Int(i)) => Value::TimeMillis(truncate_to_int(*i)),
            (Schema::Long, HostValue::Int(i)) => Value::Long(*i),
            (Schema::TimeMicros, HostValue::Int(i)) => Value::TimeMicros(*i),
            (Schema::TimestampMillis, HostValue::Int(i)) => Value::TimestampMillis(*i),
            (Schema::TimestampMicros, HostValue::Int(i)) => Value::TimestampMicros(*i),
            (Schema::TimestampNanos, HostValue::Int(i)) => Value::TimestampNanos(*i),
            (Schema::LocalTimestampMillis, HostValue::Int(i)) => Value::LocalTimestampMillis(*i),
            (Schema::LocalTimestampMicros, HostValue::Int(i)) => Value::LocalTimestampMicros(*i),
            (Schema::LocalTimestampNanos, HostValue::Int(i)) => Value::LocalTimestampNanos(*i),
            (Schema::Float, HostValue::Float(f)) => Value::Float(*f as f32),
            (Schema::Float, HostValue::Int(i)) => Value::Float(*i as f32),
            (Schema::Double, HostValue::Float(f)) => Value::Double(*f),
            (Schema::Double, HostValue::Int(i)) => Value::Double(*i as f64),
            (Schema::Bytes, HostValue::Bytes(bytes)) => Value::Bytes(bytes.clone()),
            _ => return Err(unexpected(SchemaKind::of(schema)?, value)),
        };
        Ok(converted)
    }

    /// Branch for a host value, by value kind. Candidates are tried in order
    /// of preference and compared by carrier kind, so logical-type branches
    /// are found through their `int`/`long`/`string` carrier.
    fn select_branch(&self, union: &'s UnionSchema, value: &HostValue) -> Result<Option<Branch<'s>>> {
        match value {
            HostValue::Nil => self.find_branch(union, &kind_is(SchemaKind::Null)),
            HostValue::Boolean(_) => self.find_branch(union, &kind_is(SchemaKind::Boolean)),
            HostValue::Int(_) => self.first_match(
                union,
                &[
                    &kind_is(SchemaKind::Int),
                    &kind_is(SchemaKind::Long),
                    &kind_is(SchemaKind::Double),
                    &kind_is(SchemaKind::Float),
                ],
            ),
            HostValue::Float(_) => self.first_match(
                union,
                &[&kind_is(SchemaKind::Double), &kind_is(SchemaKind::Float)],
            ),
            HostValue::String(symbol) => self.first_match(
                union,
                &[&kind_is(SchemaKind::String), &|s: &Schema| {
                    matches!(s, Schema::Enum(e) if e.symbols.iter().any(|x| x == symbol))
                }],
            ),
            HostValue::Bytes(bytes) => {
                let len = bytes.len();
                self.first_match(
                    union,
                    &[
                        &kind_is(SchemaKind::Bytes),
                        &|s: &Schema| matches!(s, Schema::Fixed(f) if f.size == len),
                        &kind_is(SchemaKind::Fixed),
                    ],
                )
            }
            HostValue::Array(_) => self.find_branch(union, &kind_is(SchemaKind::Array)),
            HostValue::Map(_) => self.first_match(
                union,
                &[&kind_is(SchemaKind::Map), &kind_is(SchemaKind::Record)],
            ),
            HostValue::Record(record) => {
                let name = record.ty().name.as_str();
                self.first_match(
                    union,
                    &[
                        &|s: &Schema| matches!(s, Schema::Record(r) if r.name.name == name),
                        &kind_is(SchemaKind::Record),
                        &kind_is(SchemaKind::Map),
                    ],
                )
            }
        }
    }

    fn first_match(
        &self,
        union: &'s UnionSchema,
        rules: &[&dyn Fn(&Schema) -> bool],
    ) -> Result<Option<Branch<'s>>> {
        for rule in rules {
            if let Some(branch) = self.find_branch(union, *rule)? {
                return Ok(Some(branch));
            }
        }
        Ok(None)
    }

    /// Depth-first over the variants. Nested unions only occur in schemas
    /// built by hand; the parser rejects them.
    fn find_branch(&self, union: &'s UnionSchema, rule: &dyn Fn(&Schema) -> bool) -> Result<Option<Branch<'s>>> {
        for (index, variant) in union.variants().iter().enumerate() {
            let variant = self.names.resolve(variant)?;
            let index = index as u32;
            if let Schema::Union(nested) = variant {
                if let Some(mut branch) = self.find_branch(nested, rule)? {
                    branch.path.insert(0, index);
                    return Ok(Some(branch));
                }
            } else if rule(variant) {
                return Ok(Some(Branch {
                    path: vec![index],
                    schema: variant,
                }));
            }
        }
        Ok(None)
    }
}
