#![cfg(feature = "device")]

//! Device-backed models reached through the repository facade.

mod transport;

use std::sync::Arc;

use datarepo::provider::device::DeviceProvider;
use datarepo::{
    Data, DataModel, DataQuery, Operator, ProviderRegistry, Repository, SelectOptions, Value,
    ValueKind, WriteStatus,
};
use transport::ScriptedPort;

fn reading_model() -> Arc<DataModel> {
    let mut builder = DataModel::builder("lab.Reading", "readings").with_provider_type("scale");
    builder.add_key_field("Channel", ValueKind::Int);
    builder.add_field("Grams", ValueKind::Double);
    builder.build()
}

fn repository_with(port: ScriptedPort) -> Repository {
    let registry = ProviderRegistry::new();
    registry
        .register(Arc::new(DeviceProvider::new("scale", "COM7", port)))
        .unwrap();
    Repository::new(Arc::new(registry))
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn select_maps_device_rows() {
    let (port, sent) = ScriptedPort::new(&[
        r#"{"items":[{"Channel":1,"Grams":"12.5"},{"Channel":2,"Grams":3}],"total":2}"#,
    ]);
    let repository = repository_with(port);
    let model = reading_model();

    let mut query = DataQuery::new();
    query.filter("Grams", Operator::Gt, 1);
    let list = repository
        .select(&Data::new(&model), &query, &SelectOptions::new())
        .unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list.total_count(), 2);
    assert_eq!(list[0].get("Grams"), Some(&Value::Double(12.5)));
    assert_eq!(list[1].data_key(), Some("2"));

    let sent = sent.lock().unwrap();
    assert_eq!(sent[0]["op"], "select");
    assert_eq!(sent[0]["storage"], "readings");
    assert_eq!(sent[0]["query"][0]["op"], ">");
}

#[test]
fn select_with_no_matching_rows_is_empty() {
    let (port, _) = ScriptedPort::new(&[r#"{"items":[],"total":0}"#, "[]"]);
    let repository = repository_with(port);
    let model = reading_model();
    let template = Data::new(&model);

    let enveloped = repository
        .select_all_by_property(&template, "Channel", 9, &SelectOptions::new())
        .unwrap();
    assert_eq!(enveloped.len(), 0);

    let bare = repository
        .select_all(&template, &SelectOptions::new())
        .unwrap();
    assert!(bare.is_empty());
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn writes_fold_device_replies_into_status() {
    let (port, sent) = ScriptedPort::new(&[
        r#"{"affected":1}"#,
        r#"{"affected":0}"#,
        r#"{"error":"channel locked"}"#,
    ]);
    let repository = repository_with(port);
    let model = reading_model();

    let mut data = Data::new(&model);
    data.set("Channel", 3);
    data.set("Grams", 1.25);
    assert_eq!(repository.insert(&mut data).unwrap(), WriteStatus::SUCCESS);
    assert!(!data.is_changed());

    data.set("Grams", 2.5);
    assert_eq!(repository.update(&mut data).unwrap(), WriteStatus::NOT_FOUND);
    assert!(data.is_changed());

    assert!(repository
        .delete(&mut data)
        .unwrap()
        .contains(WriteStatus::EXCEPTION));

    let sent = sent.lock().unwrap();
    assert_eq!(sent[1]["op"], "update");
    assert_eq!(sent[1]["key"]["Channel"], 3);
    assert_eq!(sent[1]["values"]["Grams"], 2.5);
}
