//! Host side of the Avro bridge: static type descriptors and the dynamic
//! values realized against them.

pub mod error;
pub mod types;
pub mod value;

pub use error::HostError;
pub use types::{FieldType, HostType, IntersectionType, PrimitiveKind, RecordType, TypeAlias, TypeTag};
pub use value::{ArrayValue, HostValue, MapValue, RecordValue, ValueKind};
