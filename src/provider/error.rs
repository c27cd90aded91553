use std::time::Duration;

use thiserror::Error;

use crate::record::RecordError;

/// Backend failures raised inside a provider.
///
/// Write paths fold these into a [`WriteStatus`](super::WriteStatus); read
/// paths hand them to the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },

    #[error("record has no complete key for {model}")]
    MissingKey { model: String },

    #[error("duplicate key {key} in {table}")]
    DuplicateKey { table: String, key: String },

    #[error("field {field} is not a stream field of {model}")]
    NotAStream { model: String, field: String },

    #[error("sql execution failed: {0}")]
    Sql(String),

    #[error("stream storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload codec failed: {0}")]
    Codec(String),

    #[error("port {port} busy after waiting {waited:?}")]
    Busy { port: String, waited: Duration },

    #[error("port {port} cooling down after a failure")]
    CoolingDown { port: String },

    #[error("device {port} failed: {message}")]
    Device { port: String, message: String },

    #[error("backend lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Codec(err.to_string())
    }
}

impl From<bitcode::Error> for ProviderError {
    fn from(err: bitcode::Error) -> Self {
        ProviderError::Codec(err.to_string())
    }
}
