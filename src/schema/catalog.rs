use std::collections::HashMap;
use std::sync::Arc;

use super::DataModel;

/// Models by type name, used to revive records from their text form.
#[derive(Debug, Default, Clone)]
pub struct ModelCatalog {
    models: HashMap<String, Arc<DataModel>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model. Returns `false` if its type name is already taken.
    pub fn register(&mut self, model: Arc<DataModel>) -> bool {
        if self.models.contains_key(model.type_name()) {
            return false;
        }
        self.models.insert(model.type_name().to_string(), model);
        true
    }

    pub fn with(mut self, model: Arc<DataModel>) -> Self {
        self.register(model);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<DataModel>> {
        self.models.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
