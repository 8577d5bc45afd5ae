use std::fmt;
use std::sync::Arc;

use apache_avro::Schema;
use apache_avro::schema::{ArraySchema, MapSchema, RecordSchema, UnionSchema};
use apache_avro::types::Value;
use avrobind_types::{ArrayValue, HostType, HostValue, MapValue, PrimitiveKind, RecordType, RecordValue};

use crate::config::{ConvertOptions, UnionFallback};
use crate::dispatch::Deserializer;
use crate::error::{ConversionError, Result};
use crate::reconcile::{ANYDATA, map_field_type, record_field_type, unwrap_qualifiers};
use crate::schema::{SchemaKind, SchemaNames, describe_branch, describe_union};

/// Shape of a generic value as seen by union resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GenericShape {
    Null,
    Boolean,
    Integer,
    Floating,
    Text,
    Symbol,
    Binary,
    Array,
    Map,
    Record,
    Other,
}

impl GenericShape {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Null => GenericShape::Null,
            Value::Boolean(_) => GenericShape::Boolean,
            Value::Int(_)
            | Value::Long(_)
            | Value::Date(_)
            | Value::TimeMillis(_)
            | Value::TimeMicros(_)
            | Value::TimestampMillis(_)
            | Value::TimestampMicros(_)
            | Value::TimestampNanos(_)
            | Value::LocalTimestampMillis(_)
            | Value::LocalTimestampMicros(_)
            | Value::LocalTimestampNanos(_) => GenericShape::Integer,
            Value::Float(_) | Value::Double(_) => GenericShape::Floating,
            Value::String(_) | Value::Uuid(_) => GenericShape::Text,
            Value::Enum(..) => GenericShape::Symbol,
            Value::Bytes(_) | Value::Fixed(..) => GenericShape::Binary,
            Value::Array(_) => GenericShape::Array,
            Value::Map(_) => GenericShape::Map,
            Value::Record(_) => GenericShape::Record,
            Value::Union(_, inner) => GenericShape::of(inner),
            _ => GenericShape::Other,
        }
    }

    fn accepted_by(self, kind: SchemaKind) -> bool {
        matches!(
            (kind, self),
            (SchemaKind::Record, GenericShape::Record)
                | (SchemaKind::String, GenericShape::Text)
                | (SchemaKind::Enum, GenericShape::Symbol)
                | (SchemaKind::Int | SchemaKind::Long, GenericShape::Integer)
                | (SchemaKind::Float | SchemaKind::Double, GenericShape::Floating)
                | (SchemaKind::Boolean, GenericShape::Boolean)
                | (SchemaKind::Bytes | SchemaKind::Fixed, GenericShape::Binary)
                | (SchemaKind::Array, GenericShape::Array)
                | (SchemaKind::Map, GenericShape::Map)
        )
    }
}

impl fmt::Display for GenericShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenericShape::Null => "null",
            GenericShape::Boolean => "boolean",
            GenericShape::Integer => "integer",
            GenericShape::Floating => "floating point",
            GenericShape::Text => "string",
            GenericShape::Symbol => "enum symbol",
            GenericShape::Binary => "bytes",
            GenericShape::Array => "array",
            GenericShape::Map => "map",
            GenericShape::Record => "record",
            GenericShape::Other => "unsupported",
        };
        f.write_str(s)
    }
}

fn unexpected(expected: impl fmt::Display, found: &Value) -> ConversionError {
    ConversionError::schema_mismatch(format!(
        "expected {expected} value, found {}",
        GenericShape::of(found)
    ))
}

/// Widen a 32-bit float through its shortest decimal form, so `1.1f32`
/// becomes `1.1` rather than `1.100000023841858`. Narrowing the result back
/// to `f32` yields the original value.
fn widen_float(f: f32) -> f64 {
    f.to_string().parse().unwrap_or(f64::from(f))
}

/// Walks a schema tree and a generic value tree together, producing host
/// values shaped by a target type.
pub struct DeserializeVisitor<'s> {
    pub(crate) names: SchemaNames<'s>,
    options: ConvertOptions,
}

impl<'s> DeserializeVisitor<'s> {
    pub fn new(root: &'s Schema, options: ConvertOptions) -> Self {
        Self {
            names: SchemaNames::new(root),
            options,
        }
    }

    pub fn deserialize(&self, schema: &'s Schema, ty: &HostType, value: &Value) -> Result<HostValue> {
        Deserializer::for_schema(&self.names, schema, ty)?.deserialize(self, value)
    }

    pub fn visit_null(&self, value: &Value) -> Result<HostValue> {
        match value {
            Value::Null => Ok(HostValue::Nil),
            _ => Err(ConversionError::schema_mismatch(
                "value does not match the null schema",
            )),
        }
    }

    pub fn visit_string(&self, value: &Value) -> Result<HostValue> {
        match value {
            Value::String(s) | Value::Enum(_, s) => Ok(HostValue::String(s.clone())),
            Value::Uuid(uuid) => Ok(HostValue::String(uuid.to_string())),
            other => Err(unexpected("string", other)),
        }
    }

    pub fn visit_double(&self, value: &Value) -> Result<HostValue> {
        let f = match value {
            Value::Float(f) => widen_float(*f),
            Value::Double(d) => *d,
            Value::Int(i) => f64::from(*i),
            Value::Long(l) => *l as f64,
            other => return Err(unexpected("float or double", other)),
        };
        Ok(HostValue::Float(f))
    }

    pub fn visit_integer(&self, value: &Value) -> Result<HostValue> {
        let i = match value {
            Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => i64::from(*i),
            Value::Long(l)
            | Value::TimeMicros(l)
            | Value::TimestampMillis(l)
            | Value::TimestampMicros(l)
            | Value::TimestampNanos(l)
            | Value::LocalTimestampMillis(l)
            | Value::LocalTimestampMicros(l)
            | Value::LocalTimestampNanos(l) => *l,
            other => return Err(unexpected("int or long", other)),
        };
        Ok(HostValue::Int(i))
    }

    pub fn visit_bytes(&self, value: &Value) -> Result<HostValue> {
        match value {
            Value::Bytes(bytes) | Value::Fixed(_, bytes) => Ok(HostValue::Bytes(bytes.clone())),
            other => Err(unexpected("bytes", other)),
        }
    }

    /// Scalars pass through with their natural host representation.
    pub fn visit_generic(&self, value: &Value) -> Result<HostValue> {
        match GenericShape::of(value) {
            GenericShape::Null => Ok(HostValue::Nil),
            GenericShape::Boolean => match value {
                Value::Boolean(b) => Ok(HostValue::Boolean(*b)),
                other => Err(unexpected("boolean", other)),
            },
            GenericShape::Integer => self.visit_integer(value),
            GenericShape::Floating => self.visit_double(value),
            GenericShape::Text | GenericShape::Symbol => self.visit_string(value),
            GenericShape::Binary => self.visit_bytes(value),
            _ => Err(unexpected("scalar", value)),
        }
    }

    pub fn visit_array(&self, schema: &'s ArraySchema, ty: &HostType, value: &Value) -> Result<HostValue> {
        let Value::Array(items) = value else {
            return Err(unexpected("array", value));
        };
        let (array_ty, element_ty) = array_target(ty)?;
        let element_schema = self.names.resolve(&schema.items)?;

        let values = if SchemaKind::of(element_schema)? == SchemaKind::Array {
            NestedArrayVisitor { parent: self }.visit(element_schema, &array_ty, element_ty, items)?
        } else {
            let element = Deserializer::for_schema(&self.names, element_schema, element_ty)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    element
                        .deserialize(self, item)
                        .map_err(|e| e.with_context(format!("[{i}]")))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let mut array = HostValue::Array(ArrayValue::with_items(array_ty, values));
        if ty.is_read_only() {
            array.freeze();
        }
        Ok(array)
    }

    pub fn visit_map(&self, schema: &'s MapSchema, ty: &HostType, value: &Value) -> Result<HostValue> {
        let Value::Map(entries) = value else {
            return Err(unexpected("map", value));
        };
        let target = unwrap_qualifiers(ty)?;
        let (map_ty, value_ty) = match target {
            HostType::Map(value_ty) => (target.clone(), value_ty.as_ref()),
            HostType::Primitive(PrimitiveKind::Anydata) => (HostType::map(HostType::ANYDATA), &ANYDATA),
            other => return Err(ConversionError::type_mismatch("map type", other)),
        };
        let value_schema = self.names.resolve(&schema.types)?;

        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();
        let mut map = MapValue::new(map_ty);
        for key in keys {
            let converted = self
                .visit_map_value(value_schema, value_ty, &entries[key])
                .map_err(|e| e.with_context(format!("key '{key}'")))?;
            map.insert(key.clone(), converted)?;
        }

        let mut map = HostValue::Map(map);
        if ty.is_read_only() {
            map.freeze();
        }
        Ok(map)
    }

    fn visit_map_value(&self, schema: &'s Schema, ty: &HostType, value: &Value) -> Result<HostValue> {
        match schema {
            Schema::Array(array) => self.visit_array(array, ty, value),
            Schema::Bytes | Schema::Fixed(_) => self.visit_bytes(value),
            Schema::Record(record) => self.visit_record(record, ty, value),
            Schema::Enum(_) | Schema::String => self.visit_string(value),
            Schema::Float => self.visit_double(value),
            Schema::Map(map) => self.visit_map(map, ty, value),
            _ => self.deserialize(schema, ty, value),
        }
    }

    pub fn visit_record(&self, schema: &'s RecordSchema, ty: &HostType, value: &Value) -> Result<HostValue> {
        let Value::Record(fields) = value else {
            return Err(unexpected("record", value));
        };
        let target = unwrap_qualifiers(ty)?;
        let mut realized = match target {
            HostType::Record(record_type) => Realized::Closed(RecordValue::new(Arc::clone(record_type))),
            HostType::Map(value_ty) => Realized::Open(MapValue::new(target.clone()), value_ty.as_ref()),
            HostType::Primitive(PrimitiveKind::Anydata) => {
                Realized::Open(MapValue::new(HostType::map(HostType::ANYDATA)), &ANYDATA)
            }
            other => return Err(ConversionError::type_mismatch("record type", other)),
        };

        for field in &schema.fields {
            let generic = fields
                .iter()
                .find(|(name, _)| *name == field.name)
                .map(|(_, v)| v)
                .ok_or_else(|| {
                    ConversionError::schema_mismatch(format!("missing field '{}'", field.name))
                })?;
            let field_schema = self.names.resolve(&field.schema)?;
            let converted = match (target, &realized) {
                (HostType::Record(record_type), _) => {
                    self.visit_record_field(target, record_type, &field.name, field_schema, generic)
                }
                (_, Realized::Open(_, value_ty)) => {
                    self.deserialize(field_schema, value_ty, generic).map(Some)
                }
                (other, Realized::Closed(_)) => Err(ConversionError::type_mismatch("record type", other)),
            }
            .map_err(|e| e.with_context(format!("field '{}'", field.name)))?;

            if let Some(converted) = converted {
                realized.set(&field.name, converted)?;
            }
        }

        let mut record = realized.into_value();
        if ty.is_read_only() {
            record.freeze();
        }
        Ok(record)
    }

    /// Per-field dispatch of a closed record. `None` means the field is left
    /// unset (a dropped union value).
    fn visit_record_field(
        &self,
        parent: &HostType,
        record_type: &RecordType,
        name: &str,
        schema: &'s Schema,
        value: &Value,
    ) -> Result<Option<HostValue>> {
        let declared = record_type.field(name).map(|f| &f.ty);
        let converted = match schema {
            Schema::Map(map) => self.visit_map(map, map_field_type(parent, declared)?, value)?,
            Schema::Array(array) => self.visit_array(array, declared.unwrap_or(&ANYDATA), value)?,
            Schema::Bytes => self.visit_bytes(value)?,
            Schema::Record(record) => {
                self.visit_record(record, record_field_type(parent, declared)?, value)?
            }
            Schema::String => self.visit_string(value)?,
            Schema::Int => self.visit_integer(value)?,
            Schema::Float => self.visit_double(value)?,
            Schema::Union(union) => {
                return self.visit_union(union, declared.unwrap_or(&ANYDATA), Some(parent), value);
            }
            _ => self.deserialize(schema, declared.unwrap_or(&ANYDATA), value)?,
        };
        Ok(Some(converted))
    }

    /// Union reached through the dispatch table rather than a record field.
    /// A dropped value becomes nil.
    pub fn visit_top_level_union(&self, schema: &'s UnionSchema, ty: &HostType, value: &Value) -> Result<HostValue> {
        Ok(self.visit_union(schema, ty, None, value)?.unwrap_or(HostValue::Nil))
    }

    fn visit_union<'t>(
        &self,
        schema: &'s UnionSchema,
        ty: &'t HostType,
        parent: Option<&'t HostType>,
        value: &Value,
    ) -> Result<Option<HostValue>> {
        if let Some(converted) = self.resolve_union(schema, ty, parent, value)? {
            return Ok(Some(converted));
        }
        let shape = GenericShape::of(value);
        match self.options.union_fallback {
            UnionFallback::Error => Err(ConversionError::schema_mismatch(format!(
                "no branch of union {} matches a value of shape '{shape}'",
                describe_union(schema)
            ))),
            UnionFallback::Nil => {
                tracing::warn!(
                    union = %describe_union(schema),
                    %shape,
                    "no union branch matches, dropping value"
                );
                Ok(None)
            }
        }
    }

    /// Branch for a generic value. A decoded `Value::Union(index, _)` names
    /// its branch; a bare value takes the first branch, in declaration
    /// order, whose kind accepts its shape. Null short-circuits to nil.
    fn resolve_union<'t>(
        &self,
        schema: &'s UnionSchema,
        ty: &'t HostType,
        parent: Option<&'t HostType>,
        value: &Value,
    ) -> Result<Option<HostValue>> {
        let (tagged, inner) = match value {
            Value::Union(index, inner) => (Some(*index as usize), inner.as_ref()),
            other => (None, other),
        };
        let shape = GenericShape::of(inner);
        if shape == GenericShape::Null {
            return Ok(Some(HostValue::Nil));
        }

        if let Some(index) = tagged {
            let variant = schema.variants().get(index).ok_or_else(|| {
                ConversionError::schema_mismatch(format!(
                    "branch index {index} is out of range for union {}",
                    describe_union(schema)
                ))
            })?;
            let branch = self.names.resolve(variant)?;
            if !shape.accepted_by(SchemaKind::of(branch)?) {
                return Ok(None);
            }
            return self.visit_branch(index, branch, ty, parent, inner).map(Some);
        }

        for (index, branch) in schema.variants().iter().enumerate() {
            let branch = self.names.resolve(branch)?;
            let Ok(kind) = SchemaKind::of(branch) else {
                continue;
            };
            if shape.accepted_by(kind) {
                return self.visit_branch(index, branch, ty, parent, inner).map(Some);
            }
        }
        Ok(None)
    }

    fn visit_branch<'t>(
        &self,
        index: usize,
        branch: &'s Schema,
        ty: &'t HostType,
        parent: Option<&'t HostType>,
        value: &Value,
    ) -> Result<HostValue> {
        tracing::debug!(index, branch = %describe_branch(branch), "union branch selected");
        match branch {
            Schema::Record(record) => {
                let target = match parent {
                    Some(parent) => record_field_type(parent, Some(ty))?,
                    None => ty,
                };
                self.visit_record(record, target, value)
            }
            Schema::Map(map) => {
                let target = match parent {
                    Some(parent) => map_field_type(parent, Some(ty))?,
                    None => ty,
                };
                self.visit_map(map, target, value)
            }
            _ => self.deserialize(branch, ty, value),
        }
    }
}

/// Arrays whose elements are themselves arrays. The inner element schema
/// gets its own deserializer, scoped to the inner array type.
struct NestedArrayVisitor<'v, 's> {
    parent: &'v DeserializeVisitor<'s>,
}

impl<'s> NestedArrayVisitor<'_, 's> {
    fn visit(
        &self,
        inner_schema: &'s Schema,
        array_ty: &HostType,
        element_ty: &HostType,
        items: &[Value],
    ) -> Result<Vec<HostValue>> {
        let inner_ty = match unwrap_qualifiers(element_ty)? {
            HostType::Array(_) => element_ty,
            _ => array_ty,
        };
        let inner = Deserializer::for_schema(&self.parent.names, inner_schema, inner_ty)?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                inner
                    .deserialize(self.parent, item)
                    .map_err(|e| e.with_context(format!("[{i}]")))
            })
            .collect()
    }
}

/// Array type to instantiate and the element type to recurse with.
fn array_target(ty: &HostType) -> Result<(HostType, &HostType)> {
    let target = unwrap_qualifiers(ty)?;
    match target {
        HostType::Array(element) => Ok((target.clone(), element.as_ref())),
        HostType::Primitive(PrimitiveKind::Anydata) => Ok((HostType::array(HostType::ANYDATA), &ANYDATA)),
        other => Err(ConversionError::type_mismatch("array type", other)),
    }
}

/// Record value under construction: closed against a record type, or open
/// against a map or `anydata` target.
enum Realized<'t> {
    Closed(RecordValue),
    Open(MapValue, &'t HostType),
}

impl Realized<'_> {
    fn set(&mut self, name: &str, value: HostValue) -> Result<()> {
        match self {
            Realized::Closed(record) => record.set_field(name, value)?,
            Realized::Open(map, _) => {
                map.insert(name, value)?;
            }
        }
        Ok(())
    }

    fn into_value(self) -> HostValue {
        match self {
            Realized::Closed(record) => HostValue::Record(record),
            Realized::Open(map, _) => HostValue::Map(map),
        }
    }
}

#[cfg(test)]
mod tests {
    use avrobind_types::FieldType;

    use super::*;
    use crate::ErrorKind;

    fn visitor(schema: &Schema) -> DeserializeVisitor<'_> {
        DeserializeVisitor::new(schema, ConvertOptions::default())
    }

    #[test]
    fn test_widen_float_keeps_decimal_form() {
        assert_eq!(widen_float(1.1), 1.1);
        assert_eq!(widen_float(1.1) as f32, 1.1f32);
        assert!(widen_float(f32::NAN).is_nan());
        assert_eq!(widen_float(f32::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_generic_shape_sees_through_union() {
        let value = Value::Union(1, Box::new(Value::String("x".into())));
        assert_eq!(GenericShape::of(&value), GenericShape::Text);
        assert!(GenericShape::Integer.accepted_by(SchemaKind::Long));
        assert!(!GenericShape::Integer.accepted_by(SchemaKind::Double));
    }

    #[test]
    fn test_tagged_union_value_uses_its_branch() {
        let schema = Schema::parse_str(r#"["null", "int", "long"]"#).unwrap();
        let v = visitor(&schema);
        let Schema::Union(union) = &schema else {
            panic!("expected union");
        };
        let out = v
            .resolve_union(union, &HostType::INT, None, &Value::Union(2, Box::new(Value::Long(1 << 40))))
            .unwrap();
        assert_eq!(out, Some(HostValue::Int(1 << 40)));

        let err = v
            .resolve_union(union, &HostType::INT, None, &Value::Union(7, Box::new(Value::Int(1))))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema mismatch: branch index 7 is out of range for union [null, int, long]"
        );
    }

    #[test]
    fn test_tagged_union_value_with_wrong_shape_matches_nothing() {
        let schema = Schema::parse_str(r#"["null", "string", "int"]"#).unwrap();
        let Schema::Union(union) = &schema else {
            panic!("expected union");
        };
        let out = visitor(&schema)
            .resolve_union(union, &HostType::INT, None, &Value::Union(1, Box::new(Value::Int(1))))
            .unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn test_null_schema() {
        let schema = Schema::Null;
        let v = visitor(&schema);
        assert_eq!(v.deserialize(&schema, &HostType::NIL, &Value::Null).unwrap(), HostValue::Nil);
        let err = v.deserialize(&schema, &HostType::NIL, &Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_array_requires_array_target() {
        let schema = Schema::parse_str(r#"{"type": "array", "items": "int"}"#).unwrap();
        let err = visitor(&schema)
            .deserialize(&schema, &HostType::STRING, &Value::Array(vec![]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_record_against_map_target_is_open() {
        let schema = Schema::parse_str(
            r#"{"type": "record", "name": "P", "fields": [{"name": "x", "type": "int"}]}"#,
        )
        .unwrap();
        let value = Value::Record(vec![("x".into(), Value::Int(7))]);
        let out = visitor(&schema)
            .deserialize(&schema, &HostType::map(HostType::INT), &value)
            .unwrap();
        let map = out.as_map().unwrap();
        assert_eq!(map.get("x"), Some(&HostValue::Int(7)));
    }

    #[test]
    fn test_missing_generic_field() {
        let schema = Schema::parse_str(
            r#"{"type": "record", "name": "P", "fields": [{"name": "x", "type": "int"}]}"#,
        )
        .unwrap();
        let ty = HostType::record(RecordType::new("P", vec![FieldType::new("x", HostType::INT)]));
        let err = visitor(&schema)
            .deserialize(&schema, &ty, &Value::Record(vec![]))
            .unwrap_err();
        assert_eq!(err.to_string(), "schema mismatch: missing field 'x'");
    }
}
