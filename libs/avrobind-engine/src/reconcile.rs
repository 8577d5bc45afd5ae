//! Reconciliation of host type descriptors with schema shapes.
//!
//! Alias and read-only layers carry no structure. Every recursion point of
//! both visitors goes through [`unwrap_qualifiers`] before it looks at the
//! tag of a target type.

use avrobind_types::{HostType, PrimitiveKind, RecordType, TypeTag};

use crate::error::{ConversionError, Result};

/// Target used when nothing more specific is declared.
pub(crate) static ANYDATA: HostType = HostType::Primitive(PrimitiveKind::Anydata);

/// Strip alias and read-only layers down to the first structural type.
///
/// For a read-only intersection the constituent whose tag matches the
/// intersection's effective tag is selected. An intersection without such a
/// constituent is a contract violation.
pub fn unwrap_qualifiers(ty: &HostType) -> Result<&HostType> {
    let mut current = ty.implied();
    loop {
        let HostType::ReadOnly(intersection) = current else {
            return Ok(current);
        };
        current = intersection
            .constituents
            .iter()
            .map(HostType::implied)
            .find(|c| c.tag() == intersection.effective)
            .ok_or_else(|| {
                ConversionError::unsupported(format!(
                    "no constituent of '{ty}' matches its effective type '{}'",
                    intersection.effective
                ))
            })?;
    }
}

/// Last declared field of `record` whose unwrapped type is a map, or `record`
/// itself when there is none.
///
/// The field's own type is returned, qualifiers included, so a read-only map
/// field still yields a frozen map.
pub fn find_nested_map_type(record: &HostType) -> Result<&HostType> {
    find_nested(record, TypeTag::Map)
}

/// Last declared field of `record` whose unwrapped type is a record, or
/// `record` itself when there is none.
pub fn find_nested_record_type(record: &HostType) -> Result<&HostType> {
    find_nested(record, TypeTag::Record)
}

fn find_nested(record: &HostType, tag: TypeTag) -> Result<&HostType> {
    let record_type = expect_record(record)?;
    let mut found = record;
    for field in &record_type.fields {
        if unwrap_qualifiers(&field.ty)?.tag() == tag {
            found = &field.ty;
        }
    }
    Ok(found)
}

fn expect_record(ty: &HostType) -> Result<&RecordType> {
    match unwrap_qualifiers(ty)? {
        HostType::Record(record) => Ok(record),
        other => Err(ConversionError::type_mismatch("record type", other)),
    }
}

/// Target type of a map-valued record field.
///
/// The field's own declaration wins when it is a map (or `anydata`);
/// otherwise the record is scanned with [`find_nested_map_type`].
pub(crate) fn map_field_type<'t>(
    parent: &'t HostType,
    declared: Option<&'t HostType>,
) -> Result<&'t HostType> {
    if let Some(ty) = declared {
        if matches!(unwrap_qualifiers(ty)?.tag(), TypeTag::Map | TypeTag::Anydata) {
            return Ok(ty);
        }
    }
    find_nested_map_type(parent)
}

/// Target type of a record-valued record field. Mirrors [`map_field_type`].
pub(crate) fn record_field_type<'t>(
    parent: &'t HostType,
    declared: Option<&'t HostType>,
) -> Result<&'t HostType> {
    if let Some(ty) = declared {
        if matches!(
            unwrap_qualifiers(ty)?.tag(),
            TypeTag::Record | TypeTag::Map | TypeTag::Anydata
        ) {
            return Ok(ty);
        }
    }
    find_nested_record_type(parent)
}
