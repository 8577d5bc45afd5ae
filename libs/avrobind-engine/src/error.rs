use std::fmt;

use avrobind_types::HostError;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Category of a conversion failure. All kinds are permanent: conversion is a
/// pure function of its inputs, so retrying never helps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Value shape disagrees with the declared schema.
    SchemaMismatch,
    /// No structural match while unwrapping a qualifier, or a schema tag the
    /// engine cannot convert.
    UnsupportedType,
    /// Target type is not the expected structural kind.
    TypeMismatch,
    /// Host value operation rejected (frozen value, undeclared field).
    Host,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SchemaMismatch => f.write_str("schema mismatch"),
            ErrorKind::UnsupportedType => f.write_str("unsupported type"),
            ErrorKind::TypeMismatch => f.write_str("type mismatch"),
            ErrorKind::Host => f.write_str("host"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    #[error("unsupported type: {reason}")]
    UnsupportedType { reason: String },

    #[error("type mismatch: {reason}")]
    TypeMismatch { reason: String },

    #[error("host error: {0}")]
    Host(#[from] HostError),
}

impl ConversionError {
    pub fn schema_mismatch(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch { reason: reason.into() }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedType { reason: reason.into() }
    }

    pub fn type_mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        Self::TypeMismatch {
            reason: format!("expected {expected}, found '{found}'"),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            ConversionError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            ConversionError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ConversionError::Host(_) => ErrorKind::Host,
        }
    }

    /// Add location context, preserving the kind.
    ///
    /// Produces: `"context: original reason"`. Host errors are left as-is.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            ConversionError::SchemaMismatch { reason } => ConversionError::SchemaMismatch {
                reason: format!("{ctx}: {reason}"),
            },
            ConversionError::UnsupportedType { reason } => ConversionError::UnsupportedType {
                reason: format!("{ctx}: {reason}"),
            },
            ConversionError::TypeMismatch { reason } => ConversionError::TypeMismatch {
                reason: format!("{ctx}: {reason}"),
            },
            other => other,
        }
    }
}
