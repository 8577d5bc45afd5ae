use avrobind_engine::ConversionError;

/// Underlying failure of an encode or decode.
#[derive(Debug, thiserror::Error)]
pub enum Cause {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Avro(#[from] apache_avro::Error),
}

/// Error reported by the codec. The failure that produced it is available
/// through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum AvroError {
    #[error("Avro serialization error")]
    Serialization(#[source] Cause),

    #[error("Avro deserialization error")]
    Deserialization(#[source] Cause),

    #[error("config error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvroErrorKind {
    Serialization,
    Deserialization,
    Config,
}

impl AvroError {
    pub fn serialization(cause: impl Into<Cause>) -> Self {
        AvroError::Serialization(cause.into())
    }

    pub fn deserialization(cause: impl Into<Cause>) -> Self {
        AvroError::Deserialization(cause.into())
    }

    pub fn kind(&self) -> AvroErrorKind {
        match self {
            AvroError::Serialization(_) => AvroErrorKind::Serialization,
            AvroError::Deserialization(_) => AvroErrorKind::Deserialization,
            AvroError::Config(_) => AvroErrorKind::Config,
        }
    }

    /// The conversion failure behind this error, if the value (rather than
    /// the encoder) was rejected.
    pub fn conversion(&self) -> Option<&ConversionError> {
        match self {
            AvroError::Serialization(Cause::Conversion(e))
            | AvroError::Deserialization(Cause::Conversion(e)) => Some(e),
            _ => None,
        }
    }

    /// Prepend context to a config error. Other kinds are left as-is.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            AvroError::Config(msg) => AvroError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
