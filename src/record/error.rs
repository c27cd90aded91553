use thiserror::Error;

/// Errors raised by record construction and the record text form.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A record of one model was offered to a list or operation bound to another.
    #[error("record of model {found} does not belong to model {expected}")]
    ModelMismatch { expected: String, found: String },

    /// A text payload names a model the catalog does not know.
    #[error("unknown model type {0}")]
    UnknownModel(String),

    #[error("malformed record text: {0}")]
    Malformed(#[from] serde_json::Error),
}
