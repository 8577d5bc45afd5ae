//! Avro binary codec for host values.
//!
//! Wraps the conversion engine with schema loading, configuration and the
//! binary encoder. Every failure is reported as an [`AvroError`] of kind
//! serialization, deserialization or config.

mod codec;
mod config;
mod error;

pub use codec::AvroCodec;
pub use config::CodecConfig;
pub use error::{AvroError, AvroErrorKind, Cause};
