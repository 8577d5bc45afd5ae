use std::fmt;
use std::sync::Arc;

/// Scalar kinds of the host type vocabulary.
///
/// `Readonly` is the bare `readonly` type that appears as a constituent of
/// read-only intersections. `Anydata` is the target used when no static shape
/// is known: records realized against it become open maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Nil,
    Boolean,
    Int,
    Float,
    String,
    Byte,
    Readonly,
    Anydata,
}

/// Flat tag of a type descriptor. Two descriptors with the same tag have the
/// same structural kind, not necessarily the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Nil,
    Boolean,
    Int,
    Float,
    String,
    Byte,
    Readonly,
    Anydata,
    Map,
    Record,
    Array,
    Alias,
    Intersection,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeTag::Nil => "nil",
            TypeTag::Boolean => "boolean",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::String => "string",
            TypeTag::Byte => "byte",
            TypeTag::Readonly => "readonly",
            TypeTag::Anydata => "anydata",
            TypeTag::Map => "map",
            TypeTag::Record => "record",
            TypeTag::Array => "array",
            TypeTag::Alias => "alias",
            TypeTag::Intersection => "intersection",
        };
        f.write_str(s)
    }
}

/// Static type descriptor of the host runtime.
///
/// `Alias` and `ReadOnly` are qualifier layers: they never describe a shape on
/// their own and must be unwrapped before structural matching.
#[derive(Debug, Clone, PartialEq)]
pub enum HostType {
    Primitive(PrimitiveKind),
    /// Open map with string keys, constrained to the given value type.
    Map(Box<HostType>),
    /// Closed record with named, typed fields.
    Record(Arc<RecordType>),
    Array(Box<HostType>),
    Alias(Arc<TypeAlias>),
    /// `readonly & T`, the read-only intersection.
    ReadOnly(Arc<IntersectionType>),
}

/// A declared record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    pub name: String,
    pub ty: HostType,
}

impl FieldType {
    pub fn new(name: impl Into<String>, ty: HostType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Closed record shape. Field order is declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<FieldType>,
    /// Deeply immutable record (`readonly` record type).
    pub readonly: bool,
}

impl RecordType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldType>) -> Self {
        Self {
            name: name.into(),
            fields,
            readonly: false,
        }
    }

    /// Mark every value of this record type as deeply immutable.
    pub fn immutable(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Named reference to another type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAlias {
    pub name: String,
    pub target: HostType,
}

/// Intersection of constituent types with a nominal effective tag.
///
/// The effective tag names which constituent carries the structure: for
/// `readonly & Person` the constituents are `[readonly, Person]` and the
/// effective tag is `Record`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionType {
    pub constituents: Vec<HostType>,
    pub effective: TypeTag,
}

impl HostType {
    pub const NIL: HostType = HostType::Primitive(PrimitiveKind::Nil);
    pub const BOOLEAN: HostType = HostType::Primitive(PrimitiveKind::Boolean);
    pub const INT: HostType = HostType::Primitive(PrimitiveKind::Int);
    pub const FLOAT: HostType = HostType::Primitive(PrimitiveKind::Float);
    pub const STRING: HostType = HostType::Primitive(PrimitiveKind::String);
    pub const BYTE: HostType = HostType::Primitive(PrimitiveKind::Byte);
    pub const ANYDATA: HostType = HostType::Primitive(PrimitiveKind::Anydata);

    /// `byte[]`.
    pub fn bytes() -> Self {
        HostType::Array(Box::new(HostType::BYTE))
    }

    pub fn map(value: HostType) -> Self {
        HostType::Map(Box::new(value))
    }

    pub fn array(element: HostType) -> Self {
        HostType::Array(Box::new(element))
    }

    pub fn record(record: RecordType) -> Self {
        HostType::Record(Arc::new(record))
    }

    pub fn alias(name: impl Into<String>, target: HostType) -> Self {
        HostType::Alias(Arc::new(TypeAlias {
            name: name.into(),
            target,
        }))
    }

    /// `readonly & inner`. The effective tag is the tag of `inner` with its
    /// aliases resolved.
    pub fn read_only(inner: HostType) -> Self {
        let effective = inner.implied().tag();
        HostType::ReadOnly(Arc::new(IntersectionType {
            constituents: vec![HostType::Primitive(PrimitiveKind::Readonly), inner],
            effective,
        }))
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            HostType::Primitive(kind) => match kind {
                PrimitiveKind::Nil => TypeTag::Nil,
                PrimitiveKind::Boolean => TypeTag::Boolean,
                PrimitiveKind::Int => TypeTag::Int,
                PrimitiveKind::Float => TypeTag::Float,
                PrimitiveKind::String => TypeTag::String,
                PrimitiveKind::Byte => TypeTag::Byte,
                PrimitiveKind::Readonly => TypeTag::Readonly,
                PrimitiveKind::Anydata => TypeTag::Anydata,
            },
            HostType::Map(_) => TypeTag::Map,
            HostType::Record(_) => TypeTag::Record,
            HostType::Array(_) => TypeTag::Array,
            HostType::Alias(_) => TypeTag::Alias,
            HostType::ReadOnly(_) => TypeTag::Intersection,
        }
    }

    /// Follow alias layers only. Read-only intersections are left in place.
    pub fn implied(&self) -> &HostType {
        let mut ty = self;
        while let HostType::Alias(alias) = ty {
            ty = &alias.target;
        }
        ty
    }

    /// Whether values realized against this type must be deep-frozen.
    pub fn is_read_only(&self) -> bool {
        match self.implied() {
            HostType::ReadOnly(_) => true,
            HostType::Record(record) => record.readonly,
            HostType::Primitive(PrimitiveKind::Readonly) => true,
            _ => false,
        }
    }

    pub fn as_record(&self) -> Option<&Arc<RecordType>> {
        match self {
            HostType::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Primitive(_) => write!(f, "{}", self.tag()),
            HostType::Map(value) => write!(f, "map<{value}>"),
            HostType::Record(record) => f.write_str(&record.name),
            HostType::Array(element) => write!(f, "{element}[]"),
            HostType::Alias(alias) => f.write_str(&alias.name),
            HostType::ReadOnly(intersection) => {
                for (i, c) in intersection.constituents.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" & ")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> HostType {
        HostType::record(RecordType::new(
            "Person",
            vec![
                FieldType::new("name", HostType::STRING),
                FieldType::new("age", HostType::INT),
            ],
        ))
    }

    #[test]
    fn test_read_only_effective_tag_follows_alias() {
        let ty = HostType::read_only(HostType::alias("PersonRef", person()));
        let HostType::ReadOnly(intersection) = &ty else {
            panic!("expected intersection");
        };
        assert_eq!(intersection.effective, TypeTag::Record);
        assert!(ty.is_read_only());
    }

    #[test]
    fn test_immutable_record_is_read_only() {
        let ty = HostType::record(RecordType::new("Frozen", vec![]).immutable());
        assert!(ty.is_read_only());
        assert!(!person().is_read_only());
        assert!(HostType::alias("Alias", ty).is_read_only());
    }

    #[test]
    fn test_display() {
        assert_eq!(HostType::map(HostType::array(HostType::INT)).to_string(), "map<int[]>");
        assert_eq!(HostType::read_only(person()).to_string(), "readonly & Person");
    }
}
