use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::field::{FieldAttributes, FieldDef};
use crate::record::Data;
use crate::value::ValueKind;

pub const DEFAULT_KEY_SEPARATOR: &str = "/";

/// Custom stream path derivation installed on a model.
pub type StreamPathFn = Arc<dyn Fn(&DataModel, &Data) -> Vec<String> + Send + Sync>;

/// Field catalog for one logical entity kind.
///
/// Models are assembled with [`DataModelBuilder`] and frozen into an
/// `Arc<DataModel>` shared by every record of that kind. Field registrations
/// and the derived name lists never change after `build()`.
pub struct DataModel {
    type_name: String,
    storage_name: String,
    key_separator: String,
    repository_provider_type: Option<String>,
    repository_type: Option<String>,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
    field_names: Vec<String>,
    key_field_names: Vec<String>,
    stream_path: Option<StreamPathFn>,
}

impl DataModel {
    pub fn builder(type_name: impl Into<String>, storage_name: impl Into<String>) -> DataModelBuilder {
        DataModelBuilder::new(type_name, storage_name)
    }

    /// Fully qualified identifier, written into the record text form.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn key_separator(&self) -> &str {
        &self.key_separator
    }

    pub fn repository_provider_type(&self) -> Option<&str> {
        self.repository_provider_type.as_deref()
    }

    pub fn repository_type(&self) -> Option<&str> {
        self.repository_type.as_deref()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Case-insensitive lookup, for backends that fold column names.
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.field(name).or_else(|| {
            self.fields
                .iter()
                .find(|field| field.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn value_kind(&self, name: &str) -> Option<ValueKind> {
        self.field(name).map(|field| field.kind)
    }

    pub fn is_stored(&self, name: &str) -> bool {
        self.field(name).map(FieldDef::is_stored).unwrap_or(false)
    }

    pub fn attribute(&self, name: &str, key: &str) -> Option<String> {
        self.field(name).and_then(|field| field.attributes.get(key))
    }

    pub fn attribute_flag(&self, name: &str, key: &str) -> bool {
        self.field(name)
            .map(|field| field.attributes.flag(key))
            .unwrap_or(false)
    }

    /// Stored field names, sorted.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Primary-key field names in declaration order.
    pub fn key_field_names(&self) -> &[String] {
        &self.key_field_names
    }

    pub fn stream_field_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.kind == ValueKind::Stream)
            .map(|field| field.name.as_str())
    }

    pub fn storage_key_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.attributes.storage_key)
    }

    /// Composite key from the record's key fields, or `None` while any key
    /// part is still empty.
    pub fn data_key(&self, data: &Data) -> Option<String> {
        let parts = self.key_parts(data)?;
        Some(parts.join(&self.key_separator))
    }

    /// Key parts rendered as text, or `None` while any part is empty.
    pub fn key_parts(&self, data: &Data) -> Option<Vec<String>> {
        if self.key_field_names.is_empty() {
            return None;
        }
        self.key_field_names
            .iter()
            .map(|name| match data.get(name) {
                Some(value) if !value.is_empty_key() => Some(value.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Tenant/partition discriminator for the record; empty when the model
    /// has no storage-key field.
    pub fn storage_key(&self, data: &Data) -> String {
        self.storage_key_field()
            .and_then(|field| data.get(&field.name))
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    /// Hierarchical location of the record's stream payloads.
    pub fn stream_path(&self, data: &Data) -> Vec<String> {
        match &self.stream_path {
            Some(custom) => custom(self, data),
            None => self.default_stream_path(data),
        }
    }

    /// `[storage key?, storage name, key parts...]`.
    pub fn default_stream_path(&self, data: &Data) -> Vec<String> {
        let mut path = Vec::new();
        let storage_key = self.storage_key(data);
        if !storage_key.is_empty() {
            path.push(storage_key);
        }
        path.push(self.storage_name.clone());
        if let Some(parts) = self.key_parts(data) {
            path.extend(parts);
        }
        path
    }
}

impl fmt::Debug for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataModel")
            .field("type_name", &self.type_name)
            .field("storage_name", &self.storage_name)
            .field("fields", &self.fields)
            .field("key_field_names", &self.key_field_names)
            .finish()
    }
}

/// Assembles a [`DataModel`].
///
/// Registration is idempotent: re-adding an existing name returns `false` and
/// leaves the first registration untouched.
pub struct DataModelBuilder {
    type_name: String,
    storage_name: String,
    key_separator: String,
    repository_provider_type: Option<String>,
    repository_type: Option<String>,
    fields: Vec<FieldDef>,
    stream_path: Option<StreamPathFn>,
}

impl DataModelBuilder {
    pub fn new(type_name: impl Into<String>, storage_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            storage_name: storage_name.into(),
            key_separator: DEFAULT_KEY_SEPARATOR.to_string(),
            repository_provider_type: None,
            repository_type: None,
            fields: Vec::new(),
            stream_path: None,
        }
    }

    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }

    /// Name of the provider that should handle this model.
    pub fn with_provider_type(mut self, provider: impl Into<String>) -> Self {
        self.repository_provider_type = Some(provider.into());
        self
    }

    /// Coarser repository grouping, mapped to a default provider by the registry.
    pub fn with_repository_type(mut self, repository_type: impl Into<String>) -> Self {
        self.repository_type = Some(repository_type.into());
        self
    }

    pub fn with_stream_path<F>(mut self, path: F) -> Self
    where
        F: Fn(&DataModel, &Data) -> Vec<String> + Send + Sync + 'static,
    {
        self.stream_path = Some(Arc::new(path));
        self
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    pub fn add_field_with(
        &mut self,
        name: impl Into<String>,
        kind: ValueKind,
        attributes: FieldAttributes,
    ) -> bool {
        let name = name.into();
        if self.has_field(&name) {
            return false;
        }
        self.fields.push(FieldDef::new(name, kind, attributes));
        true
    }

    pub fn add_field(&mut self, name: impl Into<String>, kind: ValueKind) -> bool {
        self.add_field_with(name, kind, FieldAttributes::default())
    }

    pub fn add_key_field(&mut self, name: impl Into<String>, kind: ValueKind) -> bool {
        self.add_field_with(name, kind, FieldAttributes::key())
    }

    pub fn add_nullable_field(&mut self, name: impl Into<String>, kind: ValueKind) -> bool {
        self.add_field_with(name, kind, FieldAttributes::nullable())
    }

    /// Retract a field (and its attributes) declared by a shared base set.
    pub fn remove_field(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|field| field.name != name);
        self.fields.len() != before
    }

    pub fn set_attribute(&mut self, name: &str, key: &str, value: &str) -> bool {
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => {
                field.attributes.set(key, value);
                true
            }
            None => false,
        }
    }

    pub fn build(self) -> Arc<DataModel> {
        let index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name.clone(), i))
            .collect();

        let mut field_names: Vec<String> = self
            .fields
            .iter()
            .filter(|field| field.is_stored())
            .map(|field| field.name.clone())
            .collect();
        field_names.sort();

        let key_field_names = self
            .fields
            .iter()
            .filter(|field| field.is_key())
            .map(|field| field.name.clone())
            .collect();

        Arc::new(DataModel {
            type_name: self.type_name,
            storage_name: self.storage_name,
            key_separator: self.key_separator,
            repository_provider_type: self.repository_provider_type,
            repository_type: self.repository_type,
            fields: self.fields,
            index,
            field_names,
            key_field_names,
            stream_path: self.stream_path,
        })
    }
}
