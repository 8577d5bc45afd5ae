/// Failure of a host value operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Mutation attempted on a deep-frozen value.
    #[error("modification not allowed on read-only value of type '{ty}'")]
    Frozen { ty: String },

    /// Field not declared by a closed record type.
    #[error("field '{field}' is not declared in record '{record}'")]
    UnknownField { record: String, field: String },
}
