//! Storage backends behind the repository.
//!
//! A [`DataProvider`] reads records into a [`DataList`] and applies batch
//! writes, reporting per-batch outcome as a [`WriteStatus`]. Stream payloads
//! are optional: providers without a stream store answer
//! [`ProviderError::Unsupported`].

mod error;
mod memory;
mod status;
pub mod stream;

#[cfg(feature = "device")]
pub mod device;
#[cfg(feature = "sql")]
pub mod sql;

use crate::query::{DataQuery, SelectOptions};
use crate::record::{Data, DataList};

pub use error::ProviderError;
pub use memory::MemoryTableProvider;
pub use status::WriteStatus;
pub use stream::{FileStreamStore, LegacyLayout, MemoryStreamStore, StreamStore};

/// A named storage backend.
///
/// Reads return errors to the caller. Writes never fail outright: every
/// item of the batch is attempted per the provider's batch policy and
/// failures are folded into the returned status. Items that were written
/// are committed (`clear_changed`) in place.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Records of `data`'s model matching `query`. `data` supplies the model
    /// and, for partitioned models, the storage key.
    fn select(
        &self,
        data: &Data,
        query: &DataQuery,
        options: &SelectOptions,
    ) -> Result<DataList, ProviderError>;

    fn select_count(&self, data: &Data, query: &DataQuery) -> Result<usize, ProviderError>;

    fn insert(&self, list: &mut DataList) -> WriteStatus;

    fn update(&self, list: &mut DataList) -> WriteStatus;

    fn delete(&self, list: &mut DataList) -> WriteStatus;

    fn stream_open(&self, _data: &Data, _field: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        Err(unsupported(self.name(), "stream_open"))
    }

    fn stream_save(&self, _data: &Data, _field: &str, _content: &[u8]) -> Result<bool, ProviderError> {
        Err(unsupported(self.name(), "stream_save"))
    }

    fn stream_delete(&self, _data: &Data, _field: &str) -> Result<bool, ProviderError> {
        Err(unsupported(self.name(), "stream_delete"))
    }

    fn stream_url(&self, _data: &Data, _field: &str) -> Result<Option<String>, ProviderError> {
        Err(unsupported(self.name(), "stream_url"))
    }
}

pub(crate) fn unsupported(provider: &str, operation: &'static str) -> ProviderError {
    ProviderError::Unsupported {
        provider: provider.to_string(),
        operation,
    }
}

/// Reject stream calls for names the model does not declare as streams.
pub(crate) fn check_stream_field(data: &Data, field: &str) -> Result<(), ProviderError> {
    let model = data.model();
    match model.value_kind(field) {
        Some(crate::value::ValueKind::Stream) => Ok(()),
        _ => Err(ProviderError::NotAStream {
            model: model.type_name().to_string(),
            field: field.to_string(),
        }),
    }
}
