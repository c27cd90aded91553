//! End-to-end repository scenarios against the in-memory provider.

mod models;

use std::sync::Arc;

use datarepo::{
    Data, DataList, DataModel, DataQuery, FileStreamStore, MemoryTableProvider, ModelCatalog,
    Operator, ProviderRegistry, Repository, RepositoryConfig, SelectOptions, SortSpec, Value,
    WriteStatus, STREAM_PLACEHOLDER,
};
use models::{widget, widget_model};
use uuid::Uuid;

fn memory_repository() -> Repository {
    let registry = ProviderRegistry::new();
    registry
        .register(Arc::new(MemoryTableProvider::new("memory")))
        .unwrap();
    registry.set_default("memory").unwrap();
    Repository::new(Arc::new(registry))
}

// ============================================================================
// Widget lifecycle
// ============================================================================

#[test]
fn insert_select_update_delete() {
    let repository = memory_repository();
    let model = widget_model();
    let id = Uuid::new_v4();

    let mut data = widget(&model, id, "A");
    assert_eq!(repository.insert(&mut data).unwrap(), WriteStatus::SUCCESS);

    let template = Data::new(&model);
    let found = repository
        .select_all_by_property(&template, "Id", id, &SelectOptions::new())
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("Name"), Some(&Value::from("A")));

    let mut record = found.into_items().remove(0);
    record.set("Name", "B");
    assert_eq!(repository.update(&mut record).unwrap(), WriteStatus::SUCCESS);

    let found = repository
        .select_all_by_property(&template, "Id", id, &SelectOptions::new())
        .unwrap();
    assert_eq!(found[0].get_str("Name"), Some("B"));

    assert_eq!(repository.delete(&mut record).unwrap(), WriteStatus::SUCCESS);
    let found = repository
        .select_all_by_property(&template, "Id", id, &SelectOptions::new())
        .unwrap();
    assert_eq!(found.len(), 0);
}

#[test]
fn empty_insert_reports_empty() {
    let repository = memory_repository();
    let model = widget_model();
    let mut list = DataList::new(&model);
    let status = repository.insert_list(&mut list).unwrap();
    assert!(status.contains(WriteStatus::EMPTY));
}

#[test]
fn guid_keys_match_across_string_forms() {
    let repository = memory_repository();
    let model = widget_model();
    let id = Uuid::new_v4();
    repository.insert(&mut widget(&model, id, "A")).unwrap();

    let mut shouted = Data::new(&model);
    shouted.set("Id", id.to_string().to_uppercase());
    shouted.set("Name", "A");
    shouted.clear_changed();
    shouted.set("Name", "renamed");
    assert_eq!(repository.update(&mut shouted).unwrap(), WriteStatus::SUCCESS);

    let found = repository
        .select_all_by_property(&Data::new(&model), "Id", id, &SelectOptions::new())
        .unwrap();
    assert_eq!(found[0].get_str("Name"), Some("renamed"));

    let mut braced = Data::new(&model);
    braced.set("Id", format!("{{{}}}", id.to_string().to_uppercase()));
    braced.clear_changed();
    assert_eq!(repository.delete(&mut braced).unwrap(), WriteStatus::SUCCESS);
    assert_eq!(
        repository
            .select_count(&Data::new(&model), &DataQuery::new())
            .unwrap(),
        0
    );
}

#[test]
fn update_and_delete_of_unknown_rows() {
    let repository = memory_repository();
    let model = widget_model();
    let mut ghost = widget(&model, Uuid::new_v4(), "ghost");
    ghost.clear_changed();

    assert_eq!(repository.update(&mut ghost).unwrap(), WriteStatus::EMPTY);
    ghost.set("Name", "still a ghost");
    assert_eq!(repository.update(&mut ghost).unwrap(), WriteStatus::NOT_FOUND);
    assert_eq!(repository.delete(&mut ghost).unwrap(), WriteStatus::NOT_FOUND);
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn grouped_queries_sorting_and_paging() {
    let repository = memory_repository();
    let model = widget_model();
    let mut list = DataList::new(&model);
    for (name, price) in [("anvil", 90.0), ("axle", 12.0), ("bolt", 0.5), ("beam", 40.0)] {
        let mut data = widget(&model, Uuid::new_v4(), name);
        data.set("Price", price);
        list.push(data).unwrap();
    }
    assert!(repository.insert_list(&mut list).unwrap().is_success());

    let mut query = DataQuery::new();
    query
        .start_group()
        .filter("Name", Operator::Like, "a%")
        .add_or()
        .filter("Name", Operator::Like, "b%")
        .end_group()
        .start_group()
        .filter("Price", Operator::Gt, 10)
        .end_group();

    let options = SelectOptions::new()
        .with_sort(SortSpec::parse("Price desc"))
        .with_page(2, 2);
    let page = repository
        .select(&Data::new(&model), &query, &options)
        .unwrap();
    assert_eq!(page.total_count(), 3);
    let names: Vec<_> = page.iter().filter_map(|data| data.get_str("Name")).collect();
    assert_eq!(names, ["axle"]);
}

// ============================================================================
// Streams
// ============================================================================

#[test]
fn stream_fields_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let repository =
        Repository::from_config(&RepositoryConfig::new().with_data_folder(dir.path())).unwrap();
    let model = widget_model();
    let id = Uuid::new_v4();

    let mut data = widget(&model, id, "A");
    data.set("Drawing", Value::Stream(b"<svg/>".to_vec()));
    assert!(repository.insert(&mut data).unwrap().is_success());

    let path = dir.path().join("widgets").join(id.to_string()).join("Drawing");
    assert!(path.is_file());
    assert_eq!(
        repository.stream_open(&data, "Drawing").unwrap(),
        Some(b"<svg/>".to_vec())
    );
    assert!(!repository.stream_save(&data, "Drawing", b"<svg/>").unwrap());
    assert!(repository
        .stream_url(&data, "Drawing")
        .unwrap()
        .unwrap()
        .starts_with("file://"));

    assert!(repository.delete(&mut data).unwrap().is_success());
    assert!(!path.exists());
}

#[test]
fn legacy_stream_files_are_migrated_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let model = widget_model();
    let id = Uuid::new_v4();
    std::fs::write(dir.path().join(format!("widgets_{}_Drawing", id)), b"v1").unwrap();

    let store = FileStreamStore::new(dir.path())
        .with_legacy_layouts(vec![datarepo::LegacyLayout::Flat]);
    let registry = ProviderRegistry::new();
    registry
        .register(Arc::new(
            MemoryTableProvider::new("memory").with_stream_store(Arc::new(store)),
        ))
        .unwrap();
    registry.set_default("memory").unwrap();
    let repository = Repository::new(Arc::new(registry));

    let data = widget(&model, id, "A");
    assert_eq!(repository.stream_open(&data, "Drawing").unwrap(), Some(b"v1".to_vec()));
    assert!(dir
        .path()
        .join("widgets")
        .join(id.to_string())
        .join("Drawing")
        .is_file());
}

// ============================================================================
// Text form and untyped payloads
// ============================================================================

#[test]
fn text_form_round_trips_except_streams() {
    let model = widget_model();
    let mut catalog = ModelCatalog::new();
    catalog.register(Arc::clone(&model));

    let mut data = widget(&model, Uuid::new_v4(), "A");
    data.set("Price", 9.75);
    data.set("Drawing", Value::Stream(vec![1, 2, 3]));
    data.set("Gearing", Value::Json(serde_json::json!({"teeth": 12})));
    data.set("Color", "red");
    data.clear_changed();

    let text = data.to_text().unwrap();
    let revived = Data::from_text(&text, &catalog).unwrap();
    for name in ["Id", "Name", "Price", "Gearing", "Color"] {
        assert_eq!(revived.get(name), data.get(name), "field {}", name);
    }
    assert_eq!(revived.get_str("Drawing"), Some(STREAM_PLACEHOLDER));
    assert_eq!(revived.data_key(), data.data_key());
}

#[test]
fn untyped_payloads_map_into_records() {
    let model: Arc<DataModel> = widget_model();
    let id = Uuid::new_v4();
    let list = model.map_untyped(&serde_json::json!({
        "results": [
            {"Id": id.to_string(), "Name": "A", "Price": "4.5", "vendor": {"name": "Acme"}},
        ],
        "totalCount": 40,
    }));
    assert_eq!(list.len(), 1);
    assert_eq!(list.total_count(), 40);
    assert_eq!(list[0].get("Id"), Some(&Value::Guid(id)));
    assert_eq!(list[0].get("Price"), Some(&Value::Double(4.5)));
    assert_eq!(list[0].get_str("vendor.name"), Some("Acme"));
}
