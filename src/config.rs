//! Repository configuration.
//!
//! Loaded from TOML text or a file; every field has a default so a partial
//! file is valid.
//!
//! ```toml
//! data_folder = "/var/lib/app/data"
//! default_provider = "memory"
//! lock_wait_ms = 2000
//! legacy_stream_layouts = ["flat", { extension = "bin" }]
//!
//! [repository_types]
//! catalog = "sql"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::{FileStreamStore, LegacyLayout};
use crate::schema::{DataModel, DataModelBuilder, DEFAULT_KEY_SEPARATOR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Root of file stream storage.
    pub data_folder: PathBuf,
    /// Separator for models built through [`RepositoryConfig::model_builder`].
    pub key_separator: String,
    pub default_provider: Option<String>,
    /// Repository type -> provider name.
    pub repository_types: BTreeMap<String, String>,
    pub lock_wait_ms: u64,
    pub lock_poll_ms: u64,
    pub device_cooldown_ms: u64,
    pub legacy_stream_layouts: Vec<LegacyLayout>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("data"),
            key_separator: DEFAULT_KEY_SEPARATOR.to_string(),
            default_provider: None,
            repository_types: BTreeMap::new(),
            lock_wait_ms: 5_000,
            lock_poll_ms: 50,
            device_cooldown_ms: 2_000,
            legacy_stream_layouts: Vec::new(),
        }
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_data_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.data_folder = folder.into();
        self
    }

    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }

    pub fn with_default_provider(mut self, provider: impl Into<String>) -> Self {
        self.default_provider = Some(provider.into());
        self
    }

    pub fn with_repository_type(
        mut self,
        repository_type: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        self.repository_types
            .insert(repository_type.into(), provider.into());
        self
    }

    pub fn with_lock_wait(mut self, wait: Duration, poll: Duration) -> Self {
        self.lock_wait_ms = wait.as_millis() as u64;
        self.lock_poll_ms = poll.as_millis() as u64;
        self
    }

    pub fn with_device_cooldown(mut self, cooldown: Duration) -> Self {
        self.device_cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    pub fn with_legacy_layouts(mut self, layouts: Vec<LegacyLayout>) -> Self {
        self.legacy_stream_layouts = layouts;
        self
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn lock_poll(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms)
    }

    pub fn device_cooldown(&self) -> Duration {
        Duration::from_millis(self.device_cooldown_ms)
    }

    /// File stream store rooted at the data folder.
    pub fn file_stream_store(&self) -> FileStreamStore {
        FileStreamStore::new(&self.data_folder).with_legacy_layouts(self.legacy_stream_layouts.clone())
    }

    /// Model builder using the configured key separator.
    pub fn model_builder(
        &self,
        type_name: impl Into<String>,
        storage_name: impl Into<String>,
    ) -> DataModelBuilder {
        DataModel::builder(type_name, storage_name).with_key_separator(self.key_separator.clone())
    }
}
