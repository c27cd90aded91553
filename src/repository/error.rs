use thiserror::Error;

use crate::config::ConfigError;
use crate::provider::ProviderError;
use crate::record::RecordError;

/// Failures surfaced by repository calls.
///
/// Write calls return `Err` only when no provider could be chosen or the
/// call itself is malformed; backend failures come back as a
/// [`WriteStatus`](crate::provider::WriteStatus).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An explicit override named a provider that is not registered.
    #[error("provider {0:?} is not registered")]
    ProviderNotFound(String),

    #[error("no provider resolves for model {model}")]
    NoProvider { model: String },

    #[error("repository lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
