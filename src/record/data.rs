use std::collections::BTreeMap;
use std::sync::Arc;

use crate::schema::DataModel;
use crate::value::Value;

/// Extended value that pins a record to a named provider for every call.
pub const PROVIDER_OVERRIDE_FIELD: &str = "_provider";

/// One row of data bound to a shared [`DataModel`].
///
/// Values for names the model declares are change-tracked: the first change
/// after a commit records the previous value as the field's original. Names
/// the model does not know go to a separate extended map, which shadows model
/// values on [`Data::get`].
#[derive(Debug, Clone)]
pub struct Data {
    model: Arc<DataModel>,
    values: BTreeMap<String, Value>,
    originals: BTreeMap<String, Value>,
    extended: BTreeMap<String, Value>,
    data_key: Option<String>,
}

impl Data {
    pub fn new(model: &Arc<DataModel>) -> Self {
        Self {
            model: Arc::clone(model),
            values: BTreeMap::new(),
            originals: BTreeMap::new(),
            extended: BTreeMap::new(),
            data_key: None,
        }
    }

    pub fn model(&self) -> &Arc<DataModel> {
        &self.model
    }

    /// Current value for `name`; extended values win over model values.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extended.get(name).or_else(|| self.values.get(name))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Set a value. Unknown names are kept as extended values.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        if !self.model.has_field(name) {
            self.extended.insert(name.to_string(), value);
            return;
        }

        let current = self.values.get(name).cloned().unwrap_or_default();
        if !current.differs(&value) {
            return;
        }
        self.originals.entry(name.to_string()).or_insert(current);
        self.values.insert(name.to_string(), value);
    }

    /// Store a value in the extended map regardless of the model.
    pub fn set_extended(&mut self, name: &str, value: impl Into<Value>) {
        self.extended.insert(name.to_string(), value.into());
    }

    pub fn remove_extended(&mut self, name: &str) -> Option<Value> {
        self.extended.remove(name)
    }

    /// Model-known values.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn extended(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.extended.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_changed(&self) -> bool {
        !self.originals.is_empty()
    }

    pub fn is_field_changed(&self, name: &str) -> bool {
        self.originals.contains_key(name)
    }

    /// Value before the first uncommitted change, if the field changed.
    pub fn original(&self, name: &str) -> Option<&Value> {
        self.originals.get(name)
    }

    pub fn changed_field_names(&self) -> impl Iterator<Item = &str> {
        self.originals.keys().map(String::as_str)
    }

    /// Commit point: cache the data key from current values, forget changes.
    pub fn clear_changed(&mut self) {
        self.data_key = self.model.data_key(self);
        self.originals.clear();
    }

    pub fn clear_field_changed(&mut self, name: &str) {
        self.originals.remove(name);
    }

    /// Mark every model field changed, using its current value as original.
    pub fn set_all_changed(&mut self) {
        for field in self.model.fields() {
            let current = self.values.get(&field.name).cloned().unwrap_or_default();
            self.originals.insert(field.name.clone(), current);
        }
    }

    /// Copy for "snapshot before mutate" callers.
    ///
    /// The copy keeps the extended values and the cached data key, then
    /// replays each field's original followed by its current value. Both the
    /// copy and `self` end committed, with identical values.
    pub fn snapshot(&mut self) -> Data {
        let mut copy = Data::new(&self.model);
        copy.extended = self.extended.clone();
        for (name, current) in &self.values {
            if let Some(original) = self.originals.get(name) {
                copy.values.insert(name.clone(), original.clone());
            }
            copy.set(name, current.clone());
        }
        copy.originals.clear();
        copy.data_key = self.data_key.clone();
        self.originals.clear();
        copy
    }

    /// Full reset of values, extended values, changes and the cached key.
    pub fn clear(&mut self) {
        self.values.clear();
        self.originals.clear();
        self.extended.clear();
        self.data_key = None;
    }

    /// Key cached at the last commit point.
    pub fn data_key(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    pub(crate) fn set_data_key(&mut self, key: Option<String>) {
        self.data_key = key;
    }

    /// Key derived from the current values.
    pub fn compute_data_key(&self) -> Option<String> {
        self.model.data_key(self)
    }

    /// Value of a field as it was at the last commit point, falling back to
    /// the current value when nothing was committed yet.
    pub fn committed_value(&self, name: &str) -> Option<&Value> {
        self.originals
            .get(name)
            .filter(|original| !original.is_null())
            .or_else(|| self.values.get(name))
    }

    pub fn storage_key(&self) -> String {
        self.model.storage_key(self)
    }

    pub fn stream_path(&self) -> Vec<String> {
        self.model.stream_path(self)
    }

    pub fn provider_override(&self) -> Option<&str> {
        self.extended
            .get(PROVIDER_OVERRIDE_FIELD)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn set_provider_override(&mut self, provider: impl Into<String>) {
        self.set_extended(PROVIDER_OVERRIDE_FIELD, Value::String(provider.into()));
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.set_provider_override(provider);
        self
    }

    pub fn belongs_to(&self, model: &DataModel) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.model), model) || self.model.type_name() == model.type_name()
    }
}
