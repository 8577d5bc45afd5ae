use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::HostError;
use crate::types::{HostType, RecordType};

/// Dynamic host value.
///
/// Numbers are always 64 bits wide. Containers carry the type descriptor they
/// were created with and a `frozen` flag; scalars are immutable by nature.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Nil,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// `byte[]`.
    Bytes(Vec<u8>),
    Array(ArrayValue),
    Map(MapValue),
    Record(RecordValue),
}

/// Runtime tag of a [`HostValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Boolean,
    Int,
    Float,
    String,
    Bytes,
    Array,
    Map,
    Record,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Bytes => "byte[]",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
            ValueKind::Record => "record",
        };
        f.write_str(s)
    }
}

impl HostValue {
    pub fn string(s: impl Into<String>) -> Self {
        HostValue::String(s.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            HostValue::Nil => ValueKind::Nil,
            HostValue::Boolean(_) => ValueKind::Boolean,
            HostValue::Int(_) => ValueKind::Int,
            HostValue::Float(_) => ValueKind::Float,
            HostValue::String(_) => ValueKind::String,
            HostValue::Bytes(_) => ValueKind::Bytes,
            HostValue::Array(_) => ValueKind::Array,
            HostValue::Map(_) => ValueKind::Map,
            HostValue::Record(_) => ValueKind::Record,
        }
    }

    /// Runtime type descriptor. Frozen containers report `readonly & T`.
    pub fn type_of(&self) -> HostType {
        let (ty, frozen) = match self {
            HostValue::Nil => return HostType::NIL,
            HostValue::Boolean(_) => return HostType::BOOLEAN,
            HostValue::Int(_) => return HostType::INT,
            HostValue::Float(_) => return HostType::FLOAT,
            HostValue::String(_) => return HostType::STRING,
            HostValue::Bytes(_) => return HostType::bytes(),
            HostValue::Array(a) => (a.ty.clone(), a.frozen),
            HostValue::Map(m) => (m.ty.clone(), m.frozen),
            HostValue::Record(r) => (HostType::Record(Arc::clone(&r.ty)), r.frozen),
        };
        if frozen && !ty.is_read_only() {
            HostType::read_only(ty)
        } else {
            ty
        }
    }

    /// Whether the value rejects mutation. Scalars always do.
    pub fn is_frozen(&self) -> bool {
        match self {
            HostValue::Array(a) => a.frozen,
            HostValue::Map(m) => m.frozen,
            HostValue::Record(r) => r.frozen,
            _ => true,
        }
    }

    /// Deep-freeze the value and everything reachable from it.
    pub fn freeze(&mut self) {
        match self {
            HostValue::Array(a) => a.freeze(),
            HostValue::Map(m) => m.freeze(),
            HostValue::Record(r) => r.freeze(),
            _ => {}
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            HostValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HostValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            HostValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            HostValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            HostValue::Record(r) => Some(r),
            _ => None,
        }
    }

    /// JSON rendering used for diagnostics. Bytes become arrays of numbers,
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            HostValue::Nil => serde_json::Value::Null,
            HostValue::Boolean(b) => serde_json::Value::Bool(*b),
            HostValue::Int(i) => serde_json::json!(i),
            HostValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            HostValue::String(s) => serde_json::Value::String(s.clone()),
            HostValue::Bytes(b) => serde_json::json!(b),
            HostValue::Array(a) => {
                serde_json::Value::Array(a.items.iter().map(HostValue::to_json).collect())
            }
            HostValue::Map(m) => serde_json::Value::Object(
                m.entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            HostValue::Record(r) => serde_json::Value::Object(
                r.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Boolean(b)
    }
}

impl From<i64> for HostValue {
    fn from(i: i64) -> Self {
        HostValue::Int(i)
    }
}

impl From<f64> for HostValue {
    fn from(f: f64) -> Self {
        HostValue::Float(f)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s)
    }
}

impl From<ArrayValue> for HostValue {
    fn from(a: ArrayValue) -> Self {
        HostValue::Array(a)
    }
}

impl From<MapValue> for HostValue {
    fn from(m: MapValue) -> Self {
        HostValue::Map(m)
    }
}

impl From<RecordValue> for HostValue {
    fn from(r: RecordValue) -> Self {
        HostValue::Record(r)
    }
}

fn frozen_error(ty: &HostType) -> HostError {
    HostError::Frozen { ty: ty.to_string() }
}

// ---------------------------------------------------------------------------
// Array
// ---------------------------------------------------------------------------

/// Ordered sequence. `ty` is the array type itself (`T[]`), not the element
/// type.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    ty: HostType,
    items: Vec<HostValue>,
    frozen: bool,
}

impl ArrayValue {
    pub fn new(ty: HostType) -> Self {
        Self::with_items(ty, Vec::new())
    }

    pub fn with_items(ty: HostType, items: Vec<HostValue>) -> Self {
        Self {
            ty,
            items,
            frozen: false,
        }
    }

    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    pub fn items(&self) -> &[HostValue] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&HostValue> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HostValue> {
        self.items.iter()
    }

    pub fn push(&mut self, value: HostValue) -> Result<(), HostError> {
        if self.frozen {
            return Err(frozen_error(&self.ty));
        }
        self.items.push(value);
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.items.iter_mut().for_each(HostValue::freeze);
        self.frozen = true;
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// String-keyed open map. `ty` is the map type (`map<T>`), or `anydata` for
/// maps realized without a static shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    ty: HostType,
    entries: BTreeMap<String, HostValue>,
    frozen: bool,
}

impl MapValue {
    pub fn new(ty: HostType) -> Self {
        Self {
            ty,
            entries: BTreeMap::new(),
            frozen: false,
        }
    }

    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: HostValue,
    ) -> Result<Option<HostValue>, HostError> {
        if self.frozen {
            return Err(frozen_error(&self.ty));
        }
        Ok(self.entries.insert(key.into(), value))
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.entries.values_mut().for_each(HostValue::freeze);
        self.frozen = true;
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Value of a closed record type. Only declared fields can be set.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    ty: Arc<RecordType>,
    fields: BTreeMap<String, HostValue>,
    frozen: bool,
}

impl RecordValue {
    pub fn new(ty: Arc<RecordType>) -> Self {
        Self {
            ty,
            fields: BTreeMap::new(),
            frozen: false,
        }
    }

    pub fn ty(&self) -> &Arc<RecordType> {
        &self.ty
    }

    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Populated fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostValue)> {
        self.ty
            .fields
            .iter()
            .filter_map(|f| self.fields.get(&f.name).map(|v| (f.name.as_str(), v)))
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: HostValue) -> Result<(), HostError> {
        let name = name.into();
        if self.frozen {
            return Err(frozen_error(&HostType::Record(Arc::clone(&self.ty))));
        }
        if self.ty.field(&name).is_none() {
            return Err(HostError::UnknownField {
                record: self.ty.name.clone(),
                field: name,
            });
        }
        self.fields.insert(name, value);
        Ok(())
    }

    /// Builder form of [`set_field`](Self::set_field).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<HostValue>) -> Result<Self, HostError> {
        self.set_field(name, value.into())?;
        Ok(self)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.fields.values_mut().for_each(HostValue::freeze);
        self.frozen = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    fn point_type() -> Arc<RecordType> {
        Arc::new(RecordType::new(
            "Point",
            vec![
                FieldType::new("x", HostType::INT),
                FieldType::new("tags", HostType::array(HostType::STRING)),
            ],
        ))
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RecordValue::new(point_type())
            .with_field("z", 1i64)
            .unwrap_err();
        assert_eq!(
            err,
            HostError::UnknownField {
                record: "Point".into(),
                field: "z".into()
            }
        );
    }

    #[test]
    fn test_freeze_is_deep() {
        let tags = ArrayValue::with_items(
            HostType::array(HostType::STRING),
            vec![HostValue::string("a")],
        );
        let mut value = HostValue::Record(
            RecordValue::new(point_type())
                .with_field("x", 3i64)
                .unwrap()
                .with_field("tags", tags)
                .unwrap(),
        );
        value.freeze();

        let HostValue::Record(record) = &mut value else {
            unreachable!()
        };
        assert!(record.set_field("x", HostValue::Int(4)).is_err());
        let Some(HostValue::Array(tags)) = record.get("tags") else {
            panic!("tags missing");
        };
        assert!(tags.is_frozen());
        assert!(value.type_of().is_read_only());
    }

    #[test]
    fn test_record_iter_follows_declaration_order() {
        let record = RecordValue::new(point_type())
            .with_field("tags", ArrayValue::new(HostType::array(HostType::STRING)))
            .unwrap()
            .with_field("x", 1i64)
            .unwrap();
        let names: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["x", "tags"]);
    }

    #[test]
    fn test_frozen_map_rejects_insert() {
        let mut map = MapValue::new(HostType::map(HostType::INT));
        map.insert("a", HostValue::Int(1)).unwrap();
        map.freeze();
        assert!(matches!(
            map.insert("b", HostValue::Int(2)),
            Err(HostError::Frozen { .. })
        ));
        assert_eq!(map.get("a"), Some(&HostValue::Int(1)));
    }

    #[test]
    fn test_to_json() {
        let mut map = MapValue::new(HostType::map(HostType::ANYDATA));
        map.insert("b", HostValue::Bytes(vec![1, 2])).unwrap();
        map.insert("f", HostValue::Float(f64::NAN)).unwrap();
        assert_eq!(
            HostValue::Map(map).to_json(),
            serde_json::json!({"b": [1, 2], "f": null})
        );
    }
}
