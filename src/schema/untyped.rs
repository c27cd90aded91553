use std::sync::Arc;

use serde_json::Map;
use tracing::debug;

use super::DataModel;
use crate::record::{Data, DataList};
use crate::value::Value;

const TOTAL_KEYS: [&str; 3] = ["total", "totalCount", "total_count"];

impl DataModel {
    /// Best-effort conversion of a loosely typed payload (e.g. decoded JSON)
    /// into records of this model.
    ///
    /// - an array maps element-wise (non-object elements are skipped)
    /// - an envelope object with no model field names and an array holding
    ///   objects (or an empty array) maps that array, reading
    ///   `total`/`totalCount`/`total_count`
    /// - any other object maps as one record
    ///
    /// Known fields are coerced to their declared kind; unknown scalars become
    /// extended values; unknown nested objects flatten to `parent.child`;
    /// unknown arrays are dropped. Records come back with no pending changes.
    pub fn map_untyped(self: &Arc<Self>, raw: &serde_json::Value) -> DataList {
        let mut list = DataList::new(self);
        match raw {
            serde_json::Value::Array(items) => self.map_items(items, &mut list),
            serde_json::Value::Object(map) => match self.envelope_items(map) {
                Some(items) => {
                    self.map_items(items, &mut list);
                    let total = TOTAL_KEYS
                        .iter()
                        .find_map(|key| map.get(*key).and_then(serde_json::Value::as_u64));
                    if let Some(total) = total {
                        list.set_total_count(total as usize);
                    }
                }
                None => list.push_owned(self.map_object(map)),
            },
            other => debug!(model = %self.type_name(), shape = %other, "untyped payload is not a map"),
        }
        list
    }

    fn envelope_items<'a>(
        &self,
        map: &'a Map<String, serde_json::Value>,
    ) -> Option<&'a Vec<serde_json::Value>> {
        if map.keys().any(|key| self.find_field(key).is_some()) {
            return None;
        }
        let arrays = move || {
            map.values().filter_map(|value| match value {
                serde_json::Value::Array(items) => Some(items),
                _ => None,
            })
        };
        arrays()
            .find(|items| items.iter().any(serde_json::Value::is_object))
            .or_else(|| arrays().find(|items| items.is_empty()))
    }

    fn map_items(self: &Arc<Self>, items: &[serde_json::Value], list: &mut DataList) {
        for item in items {
            match item {
                serde_json::Value::Object(map) => list.push_owned(self.map_object(map)),
                other => debug!(model = %self.type_name(), element = %other, "skipping non-object element"),
            }
        }
    }

    fn map_object(self: &Arc<Self>, map: &Map<String, serde_json::Value>) -> Data {
        let mut data = Data::new(self);
        for (name, raw) in map {
            match self.find_field(name) {
                Some(field) => {
                    let value = Value::from_json(raw);
                    match field.kind.coerce(value.clone()) {
                        Some(coerced) => data.set(&field.name, coerced),
                        None => data.set_extended(name, value),
                    }
                }
                None => flatten_unknown(&mut data, name, raw),
            }
        }
        data.clear_changed();
        data
    }
}

fn flatten_unknown(data: &mut Data, name: &str, raw: &serde_json::Value) {
    match raw {
        serde_json::Value::Object(inner) => {
            for (child, value) in inner {
                flatten_unknown(data, &format!("{}.{}", name, child), value);
            }
        }
        serde_json::Value::Array(_) => {
            debug!(field = %name, "dropping unknown array field");
        }
        scalar => data.set_extended(name, Value::from_json(scalar)),
    }
}
