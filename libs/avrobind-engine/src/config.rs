use serde::Deserialize;

/// What to do with a value that matches no branch of a union while
/// deserializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionFallback {
    /// Fail with a schema mismatch.
    #[default]
    Error,
    /// Drop the value: a record field is left unset, a top-level value
    /// becomes nil. A warning is logged.
    Nil,
}

/// Conversion options. Deserialized from the `[options]` table of a codec
/// configuration; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub union_fallback: UnionFallback,
}
