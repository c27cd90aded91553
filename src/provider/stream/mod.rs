//! Stream storage for binary payload fields.
//!
//! Stream fields never live in table rows. Providers hand them to a
//! [`StreamStore`] keyed by the record's stream path and the field name.

mod file;
mod memory;

use tracing::{debug, warn};

use super::{ProviderError, WriteStatus};
use crate::record::{Data, STREAM_PLACEHOLDER};
use crate::value::Value;

pub use file::{FileStreamStore, LegacyLayout};
pub use memory::MemoryStreamStore;

/// Byte storage addressed by path segments plus a field name.
pub trait StreamStore: Send + Sync {
    fn open(&self, path: &[String], field: &str) -> Result<Option<Vec<u8>>, ProviderError>;

    /// Store content. Returns `false` when identical content was already there.
    fn save(&self, path: &[String], field: &str, content: &[u8]) -> Result<bool, ProviderError>;

    /// Returns `false` when nothing was stored.
    fn delete(&self, path: &[String], field: &str) -> Result<bool, ProviderError>;

    fn url(&self, path: &[String], field: &str) -> Option<String>;
}

fn stream_content(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Stream(bytes) | Value::Bytes(bytes) => Some(bytes.as_slice()),
        Value::String(text) if text == STREAM_PLACEHOLDER => None,
        Value::String(text) => Some(text.as_bytes()),
        _ => None,
    }
}

/// Stream path of the record as it was at its last commit point.
fn committed_stream_path(data: &Data) -> Vec<String> {
    let model = data.model();
    let mut committed = data.clone();
    let names = model
        .key_field_names()
        .iter()
        .map(String::as_str)
        .chain(model.storage_key_field().map(|field| field.name.as_str()));
    for name in names {
        if let Some(value) = data.committed_value(name) {
            committed.set(name, value.clone());
        }
    }
    committed.stream_path()
}

/// Move every stored payload from `from` to `to`.
fn relocate_streams(store: &dyn StreamStore, data: &Data, from: &[String], to: &[String]) -> WriteStatus {
    let mut status = WriteStatus::SUCCESS;
    let model = data.model();
    for field in model.stream_field_names() {
        let moved = store.open(from, field).and_then(|content| match content {
            Some(content) => {
                store.save(to, field, &content)?;
                store.delete(from, field).map(|_| ())
            }
            None => Ok(()),
        });
        if let Err(err) = moved {
            warn!(model = %model.type_name(), field = %field, error = %err, "stream relocation failed");
            status |= WriteStatus::STREAM_FAILURE;
        }
    }
    debug!(model = %model.type_name(), from = ?from, to = ?to, "relocated streams");
    status
}

/// Persist every changed stream field of `data`. A field changed to null is
/// deleted. When the key changed, stored payloads move to the new stream
/// path first. Failures only raise [`WriteStatus::STREAM_FAILURE`].
pub(crate) fn save_changed_streams(store: Option<&dyn StreamStore>, data: &Data) -> WriteStatus {
    let mut status = WriteStatus::SUCCESS;
    let model = data.model();
    if let Some(store) = store {
        let from = committed_stream_path(data);
        let to = data.stream_path();
        if from != to {
            status |= relocate_streams(store, data, &from, &to);
        }
    }
    for field in model.stream_field_names() {
        if !data.is_field_changed(field) {
            continue;
        }
        let path = data.stream_path();
        let value = data.get(field).cloned().unwrap_or_default();
        let result = match store {
            None if value.is_null() => Ok(()),
            None => Err(ProviderError::Unsupported {
                provider: model.type_name().to_string(),
                operation: "stream storage",
            }),
            Some(store) if value.is_null() => store.delete(&path, field).map(|_| ()),
            Some(store) => match stream_content(&value) {
                Some(content) => store.save(&path, field, content).map(|_| ()),
                None => Ok(()),
            },
        };
        if let Err(err) = result {
            warn!(model = %model.type_name(), field = %field, error = %err, "stream save failed");
            status |= WriteStatus::STREAM_FAILURE;
        }
    }
    status
}

/// Remove every stream payload of a deleted record.
pub(crate) fn delete_streams(store: Option<&dyn StreamStore>, data: &Data) -> WriteStatus {
    let Some(store) = store else {
        return WriteStatus::SUCCESS;
    };
    let mut status = WriteStatus::SUCCESS;
    let model = data.model();
    let path = data.stream_path();
    for field in model.stream_field_names() {
        if let Err(err) = store.delete(&path, field) {
            warn!(model = %model.type_name(), field = %field, error = %err, "stream delete failed");
            status |= WriteStatus::STREAM_FAILURE;
        }
    }
    status
}
