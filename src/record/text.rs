//! Round-trip text form of a record.
//!
//! ```text
//! {"type":"shop.Widget","key":"…","values":{"Name":{"String":"A"}},"extended":{}}
//! ```
//!
//! Stream values are written as the [`STREAM_PLACEHOLDER`] string rather than
//! their content.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Data, RecordError};
use crate::schema::{DataModel, ModelCatalog};
use crate::value::Value;

pub const STREAM_PLACEHOLDER: &str = "[stream]";

#[derive(Serialize, Deserialize)]
struct RecordText {
    #[serde(rename = "type")]
    type_name: String,
    key: Option<String>,
    values: BTreeMap<String, Value>,
    extended: BTreeMap<String, Value>,
}

fn for_text<'a>(entries: impl Iterator<Item = (&'a str, &'a Value)>) -> BTreeMap<String, Value> {
    entries
        .map(|(name, value)| {
            let value = match value {
                Value::Stream(_) => Value::String(STREAM_PLACEHOLDER.to_string()),
                other => other.clone(),
            };
            (name.to_string(), value)
        })
        .collect()
}

impl Data {
    pub fn to_text(&self) -> Result<String, RecordError> {
        let text = RecordText {
            type_name: self.model().type_name().to_string(),
            key: self.data_key().map(str::to_string),
            values: for_text(self.values()),
            extended: for_text(self.extended()),
        };
        Ok(serde_json::to_string(&text)?)
    }

    /// Revive a record, looking its model up by the embedded type name.
    pub fn from_text(text: &str, catalog: &ModelCatalog) -> Result<Data, RecordError> {
        let parsed: RecordText = serde_json::from_str(text)?;
        let model = catalog
            .get(&parsed.type_name)
            .ok_or_else(|| RecordError::UnknownModel(parsed.type_name.clone()))?;
        Ok(Self::from_parsed(parsed, model))
    }

    /// Revive a record against a known model.
    pub fn from_text_with_model(text: &str, model: &Arc<DataModel>) -> Result<Data, RecordError> {
        let parsed: RecordText = serde_json::from_str(text)?;
        if parsed.type_name != model.type_name() {
            return Err(RecordError::ModelMismatch {
                expected: model.type_name().to_string(),
                found: parsed.type_name,
            });
        }
        Ok(Self::from_parsed(parsed, model))
    }

    fn from_parsed(parsed: RecordText, model: &Arc<DataModel>) -> Data {
        let mut data = Data::new(model);
        for (name, value) in parsed.values {
            data.set(&name, value);
        }
        for (name, value) in parsed.extended {
            data.set_extended(&name, value);
        }
        data.clear_changed();
        data.set_data_key(parsed.key);
        data
    }
}
