use std::ops::{Index, IndexMut};
use std::sync::Arc;

use super::{Data, RecordError};
use crate::schema::DataModel;

/// Ordered records of one model plus an optional total match count.
///
/// `total_count` is only filled by providers that can compute it cheaply;
/// check [`DataList::is_empty`] for emptiness, not the total.
#[derive(Debug, Clone)]
pub struct DataList {
    model: Arc<DataModel>,
    items: Vec<Data>,
    total_count: usize,
}

impl DataList {
    pub fn new(model: &Arc<DataModel>) -> Self {
        Self {
            model: Arc::clone(model),
            items: Vec::new(),
            total_count: 0,
        }
    }

    /// Wrap a single record; every write path is a batch.
    pub fn single(data: Data) -> Self {
        Self {
            model: Arc::clone(data.model()),
            items: vec![data],
            total_count: 0,
        }
    }

    pub fn from_items(model: &Arc<DataModel>, items: Vec<Data>) -> Result<Self, RecordError> {
        let mut list = Self::new(model);
        for item in items {
            list.push(item)?;
        }
        Ok(list)
    }

    pub fn model(&self) -> &Arc<DataModel> {
        &self.model
    }

    pub fn push(&mut self, data: Data) -> Result<(), RecordError> {
        if !data.belongs_to(&self.model) {
            return Err(RecordError::ModelMismatch {
                expected: self.model.type_name().to_string(),
                found: data.model().type_name().to_string(),
            });
        }
        self.items.push(data);
        Ok(())
    }

    /// Push a record already known to share this list's model.
    pub(crate) fn push_owned(&mut self, data: Data) {
        debug_assert!(data.belongs_to(&self.model));
        self.items.push(data);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Data> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&Data> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Data> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Data> {
        self.items.iter_mut()
    }

    pub fn items(&self) -> &[Data] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Data> {
        self.items
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn set_total_count(&mut self, total: usize) {
        self.total_count = total;
    }
}

impl Index<usize> for DataList {
    type Output = Data;

    fn index(&self, index: usize) -> &Data {
        &self.items[index]
    }
}

impl IndexMut<usize> for DataList {
    fn index_mut(&mut self, index: usize) -> &mut Data {
        &mut self.items[index]
    }
}

impl IntoIterator for DataList {
    type Item = Data;
    type IntoIter = std::vec::IntoIter<Data>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a DataList {
    type Item = &'a Data;
    type IntoIter = std::slice::Iter<'a, Data>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a mut DataList {
    type Item = &'a mut Data;
    type IntoIter = std::slice::IterMut<'a, Data>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}
