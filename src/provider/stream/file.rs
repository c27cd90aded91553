use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::StreamStore;
use crate::provider::ProviderError;

/// Older on-disk conventions probed when a stream is not found at its
/// current location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyLayout {
    /// Every segment and the field name joined with `_` in one file name
    /// directly under the root.
    Flat,
    /// Current directory layout but the field file carries an extension.
    Extension(String),
}

/// Stream store rooted at a data folder: `root/<segments...>/<field>`.
#[derive(Debug, Clone)]
pub struct FileStreamStore {
    root: PathBuf,
    legacy: Vec<LegacyLayout>,
}

impl FileStreamStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            legacy: Vec::new(),
        }
    }

    /// Layouts tried in order when the current location is empty.
    pub fn with_legacy_layouts(mut self, layouts: Vec<LegacyLayout>) -> Self {
        self.legacy = layouts;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, path: &[String], field: &str) -> PathBuf {
        let mut location = self.root.clone();
        for segment in path {
            location.push(sanitize(segment));
        }
        location.push(sanitize(field));
        location
    }

    fn legacy_path(&self, layout: &LegacyLayout, path: &[String], field: &str) -> PathBuf {
        match layout {
            LegacyLayout::Flat => {
                let mut name: Vec<String> = path.iter().map(|segment| sanitize(segment)).collect();
                name.push(sanitize(field));
                self.root.join(name.join("_"))
            }
            LegacyLayout::Extension(extension) => {
                let mut location = self.path_for(path, field);
                location.set_extension(extension);
                location
            }
        }
    }

    /// Copy the first legacy match to the current location.
    fn migrate(&self, path: &[String], field: &str) -> Result<Option<PathBuf>, ProviderError> {
        for layout in &self.legacy {
            let old = self.legacy_path(layout, path, field);
            if !old.is_file() {
                continue;
            }
            let current = self.path_for(path, field);
            if let Some(parent) = current.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&old, &current)?;
            info!(from = %old.display(), to = %current.display(), "migrated legacy stream");
            return Ok(Some(current));
        }
        Ok(None)
    }

    fn locate(&self, path: &[String], field: &str) -> Result<Option<PathBuf>, ProviderError> {
        let current = self.path_for(path, field);
        if current.is_file() {
            return Ok(Some(current));
        }
        self.migrate(path, field)
    }
}

fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

impl StreamStore for FileStreamStore {
    fn open(&self, path: &[String], field: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        match self.locate(path, field)? {
            Some(location) => Ok(Some(fs::read(location)?)),
            None => Ok(None),
        }
    }

    fn save(&self, path: &[String], field: &str, content: &[u8]) -> Result<bool, ProviderError> {
        let location = self.path_for(path, field);
        match fs::read(&location) {
            Ok(existing) if existing == content => {
                debug!(path = %location.display(), "stream unchanged");
                return Ok(false);
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&location, content)?;
        Ok(true)
    }

    fn delete(&self, path: &[String], field: &str) -> Result<bool, ProviderError> {
        let mut removed = false;
        let mut locations = vec![self.path_for(path, field)];
        locations.extend(
            self.legacy
                .iter()
                .map(|layout| self.legacy_path(layout, path, field)),
        );
        for location in locations {
            match fs::remove_file(&location) {
                Ok(()) => removed = true,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(removed)
    }

    fn url(&self, path: &[String], field: &str) -> Option<String> {
        Some(format!("file://{}", self.path_for(path, field).display()))
    }
}
