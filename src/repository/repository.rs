use std::sync::Arc;

use tracing::{debug, warn};

use super::{ProviderRegistry, RepositoryError};
use crate::config::RepositoryConfig;
use crate::provider::{DataProvider, MemoryTableProvider, WriteStatus};
use crate::query::{DataQuery, SelectOptions};
use crate::record::{Data, DataList};
use crate::value::Value;

/// Entry point for every read and write.
///
/// Each call resolves a provider for the record (see
/// [`ResolutionStep`](super::ResolutionStep)) and delegates to it. Cloning
/// is cheap and clones share the registry.
#[derive(Clone)]
pub struct Repository {
    registry: Arc<ProviderRegistry>,
    call_override: Option<String>,
}

impl Repository {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            call_override: None,
        }
    }

    /// Registry with an in-memory default provider backed by file streams
    /// under the configured data folder.
    pub fn from_config(config: &RepositoryConfig) -> Result<Self, RepositoryError> {
        let registry = ProviderRegistry::new();
        let memory = MemoryTableProvider::new("memory")
            .with_stream_store(Arc::new(config.file_stream_store()));
        registry.register(Arc::new(memory))?;
        registry.set_default("memory")?;
        registry.apply_config(config)?;
        Ok(Self::new(Arc::new(registry)))
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// View of this repository that routes every call to `provider` unless
    /// a record carries its own override.
    pub fn using(&self, provider: impl Into<String>) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            call_override: Some(provider.into()),
        }
    }

    pub fn provider_for(
        &self,
        data: &Data,
        call_override: Option<&str>,
    ) -> Result<Arc<dyn DataProvider>, RepositoryError> {
        let call = call_override.or(self.call_override.as_deref());
        let (_, provider) = self.registry.resolve(data, call)?;
        Ok(provider)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn select(
        &self,
        data: &Data,
        query: &DataQuery,
        options: &SelectOptions,
    ) -> Result<DataList, RepositoryError> {
        let provider = self.provider_for(data, options.provider.as_deref())?;
        Ok(provider.select(data, query, options)?)
    }

    pub fn select_all(&self, data: &Data, options: &SelectOptions) -> Result<DataList, RepositoryError> {
        self.select(data, &DataQuery::new(), options)
    }

    pub fn select_all_by_property(
        &self,
        data: &Data,
        name: &str,
        value: impl Into<Value>,
        options: &SelectOptions,
    ) -> Result<DataList, RepositoryError> {
        self.select(data, &DataQuery::by_property(name, value), options)
    }

    pub fn select_count(&self, data: &Data, query: &DataQuery) -> Result<usize, RepositoryError> {
        let provider = self.provider_for(data, None)?;
        Ok(provider.select_count(data, query)?)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert one record. The record is committed in place on success.
    pub fn insert(&self, data: &mut Data) -> Result<WriteStatus, RepositoryError> {
        self.write_single(data, |repository, list| repository.insert_list(list))
    }

    pub fn update(&self, data: &mut Data) -> Result<WriteStatus, RepositoryError> {
        self.write_single(data, |repository, list| repository.update_list(list))
    }

    pub fn delete(&self, data: &mut Data) -> Result<WriteStatus, RepositoryError> {
        self.write_single(data, |repository, list| repository.delete_list(list))
    }

    /// Insert a batch. Every field of every record is written, so each
    /// record is marked fully changed once a provider has been resolved.
    pub fn insert_list(&self, list: &mut DataList) -> Result<WriteStatus, RepositoryError> {
        self.write_list(list, "insert", |provider, list| {
            for data in list.iter_mut() {
                data.set_all_changed();
            }
            provider.insert(list)
        })
    }

    pub fn update_list(&self, list: &mut DataList) -> Result<WriteStatus, RepositoryError> {
        self.write_list(list, "update", |provider, list| provider.update(list))
    }

    pub fn delete_list(&self, list: &mut DataList) -> Result<WriteStatus, RepositoryError> {
        self.write_list(list, "delete", |provider, list| provider.delete(list))
    }

    fn write_single<F>(&self, data: &mut Data, write: F) -> Result<WriteStatus, RepositoryError>
    where
        F: FnOnce(&Self, &mut DataList) -> Result<WriteStatus, RepositoryError>,
    {
        let blank = Data::new(data.model());
        let mut list = DataList::single(std::mem::replace(data, blank));
        let result = write(self, &mut list);
        if let Some(written) = list.into_items().into_iter().next() {
            *data = written;
        }
        result
    }

    fn write_list<F>(
        &self,
        list: &mut DataList,
        operation: &str,
        write: F,
    ) -> Result<WriteStatus, RepositoryError>
    where
        F: FnOnce(&dyn DataProvider, &mut DataList) -> WriteStatus,
    {
        let Some(first) = list.first() else {
            return Ok(WriteStatus::EMPTY);
        };
        let provider = self.provider_for(first, None)?;
        let status = write(provider.as_ref(), list);
        if status.is_success() {
            debug!(provider = %provider.name(), operation, items = list.len(), "write succeeded");
        } else {
            warn!(provider = %provider.name(), operation, items = list.len(), status = %status, "write degraded");
        }
        Ok(status)
    }

    // ------------------------------------------------------------------
    // Streams
    // ------------------------------------------------------------------

    pub fn stream_open(&self, data: &Data, field: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        Ok(self.provider_for(data, None)?.stream_open(data, field)?)
    }

    /// Returns `false` when identical content was already stored.
    pub fn stream_save(&self, data: &Data, field: &str, content: &[u8]) -> Result<bool, RepositoryError> {
        Ok(self.provider_for(data, None)?.stream_save(data, field, content)?)
    }

    pub fn stream_delete(&self, data: &Data, field: &str) -> Result<bool, RepositoryError> {
        Ok(self.provider_for(data, None)?.stream_delete(data, field)?)
    }

    pub fn stream_url(&self, data: &Data, field: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.provider_for(data, None)?.stream_url(data, field)?)
    }
}
