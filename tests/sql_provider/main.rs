#![cfg(feature = "sql")]

//! SQL provider behavior observed through a recording executor.

mod recording;

use std::sync::Arc;

use datarepo::provider::sql::{Postgres, SqlGenerator, SqlProvider, SqlRow};
use datarepo::{
    Data, DataList, DataModel, DataProvider, DataQuery, MemoryStreamStore, Operator,
    ProviderRegistry, Repository, SelectOptions, SortSpec, Value, ValueKind, WriteStatus,
};
use recording::RecordingExecutor;

fn order_model() -> Arc<DataModel> {
    let mut builder = DataModel::builder("shop.Order", "orders");
    builder.add_key_field("Id", ValueKind::Int);
    builder.add_field("Customer", ValueKind::ShortString);
    builder.add_nullable_field("Total", ValueKind::Double);
    builder.add_field("Invoice", ValueKind::Stream);
    builder.build()
}

fn order(model: &Arc<DataModel>, id: i32, customer: &str, total: f64) -> Data {
    let mut data = Data::new(model);
    data.set("Id", id);
    data.set("Customer", customer);
    data.set("Total", total);
    data
}

fn row(entries: &[(&str, Value)]) -> SqlRow {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

// ============================================================================
// Table preparation
// ============================================================================

#[test]
fn missing_table_is_created_once() {
    let provider = SqlProvider::new("sql", RecordingExecutor::empty());
    let model = order_model();

    let mut first = DataList::single(order(&model, 1, "acme", 10.0));
    let mut second = DataList::single(order(&model, 2, "globex", 20.0));
    assert!(provider.insert(&mut first).is_success());
    assert!(provider.insert(&mut second).is_success());

    assert_eq!(
        provider.executor().statements(),
        vec![
            "CREATE TABLE [orders] ([Id] INT NOT NULL, [Customer] NVARCHAR(255) NULL, [Total] FLOAT NULL, PRIMARY KEY ([Id]))".to_string(),
            "INSERT INTO [orders] ([Id], [Customer], [Total]) VALUES (@Id, @Customer, @Total)".to_string(),
            "INSERT INTO [orders] ([Id], [Customer], [Total]) VALUES (@Id, @Customer, @Total)".to_string(),
        ]
    );
    assert!(!first[0].is_changed());
}

#[test]
fn existing_table_gains_missing_columns() {
    let provider = SqlProvider::new("sql", RecordingExecutor::with_columns(&["ID", "customer"]))
        .with_generator(SqlGenerator::new(Postgres));
    let model = order_model();
    provider.ensure_table(&model).unwrap();
    provider.ensure_table(&model).unwrap();
    assert_eq!(
        provider.executor().statements(),
        vec!["ALTER TABLE \"orders\" ADD \"Total\" DOUBLE PRECISION NULL".to_string()]
    );
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn update_sends_changed_fields_only() {
    let provider = SqlProvider::new("sql", RecordingExecutor::with_columns(&["Id", "Customer", "Total"]));
    let model = order_model();
    let mut data = order(&model, 7, "acme", 10.0);
    data.clear_changed();
    data.set("Total", 12.5);

    let mut list = DataList::single(data);
    assert_eq!(provider.update(&mut list), WriteStatus::SUCCESS);
    let command = provider.executor().last();
    assert_eq!(command.text, "UPDATE [orders] SET [Total] = @Total WHERE [Id] = @k_Id");
    assert_eq!(
        command.params,
        vec![
            ("Total".to_string(), Value::Double(12.5)),
            ("k_Id".to_string(), Value::Int(7)),
        ]
    );
    assert!(!list[0].is_changed());
}

#[test]
fn zero_affected_rows_is_not_found() {
    let executor = RecordingExecutor::with_columns(&["Id", "Customer", "Total"])
        .affect(0)
        .affect(0);
    let provider = SqlProvider::new("sql", executor);
    let model = order_model();
    let mut data = order(&model, 7, "acme", 10.0);
    data.clear_changed();
    data.set("Customer", "initech");

    let mut list = DataList::single(data);
    assert!(provider.update(&mut list).contains(WriteStatus::NOT_FOUND));
    assert!(list[0].is_changed());
    assert!(provider.delete(&mut list).contains(WriteStatus::NOT_FOUND));
}

#[test]
fn unchanged_update_is_empty_and_sends_nothing() {
    let provider = SqlProvider::new("sql", RecordingExecutor::with_columns(&["Id", "Customer", "Total"]));
    let model = order_model();
    let mut data = order(&model, 7, "acme", 10.0);
    data.clear_changed();
    let mut list = DataList::single(data);
    assert_eq!(provider.update(&mut list), WriteStatus::EMPTY);
    assert!(provider.executor().statements().is_empty());
}

#[test]
fn keyless_delete_raises_exception() {
    let provider = SqlProvider::new("sql", RecordingExecutor::with_columns(&["Id", "Customer", "Total"]));
    let model = order_model();
    let mut list = DataList::single(Data::new(&model));
    assert!(provider.delete(&mut list).contains(WriteStatus::EXCEPTION));
}

#[test]
fn stream_fields_go_to_the_attached_store() {
    let store = Arc::new(MemoryStreamStore::new());
    let provider = SqlProvider::new("sql", RecordingExecutor::with_columns(&["Id", "Customer", "Total"]))
        .with_stream_store(store.clone());
    let model = order_model();
    let mut data = order(&model, 3, "acme", 1.0);
    data.set("Invoice", Value::Stream(b"%PDF".to_vec()));

    let mut list = DataList::single(data);
    assert!(provider.insert(&mut list).is_success());
    assert_eq!(
        provider.stream_open(&list[0], "Invoice").unwrap(),
        Some(b"%PDF".to_vec())
    );
    assert_eq!(store.len(), 1);
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn paged_select_reads_total_from_count() {
    let executor = RecordingExecutor::with_columns(&["Id", "Customer", "Total"])
        .reply(vec![row(&[
            ("Id", Value::Long(7)),
            ("Customer", Value::from("acme")),
            ("Total", Value::Double(10.0)),
            ("Region", Value::from("emea")),
        ])])
        .reply(vec![row(&[("", Value::Long(42))])]);
    let provider = SqlProvider::new("sql", executor);
    let model = order_model();

    let options = SelectOptions::new()
        .with_sort(SortSpec::parse("Total desc"))
        .with_page(3, 1);
    let list = provider
        .select(&Data::new(&model), &DataQuery::new(), &options)
        .unwrap();

    assert_eq!(list.total_count(), 42);
    assert_eq!(list[0].get("Id"), Some(&Value::Int(7)));
    assert_eq!(list[0].get_str("Region"), Some("emea"));
    assert!(!list[0].is_changed());
    assert_eq!(
        provider.executor().statements(),
        vec![
            "SELECT [Customer], [Id], [Total] FROM [orders] ORDER BY [Total] DESC OFFSET 2 ROWS FETCH NEXT 1 ROWS ONLY".to_string(),
            "SELECT COUNT(*) FROM [orders]".to_string(),
        ]
    );
}

#[test]
fn grouped_query_renders_two_levels() {
    let provider = SqlProvider::new("sql", RecordingExecutor::with_columns(&["Id", "Customer", "Total"]))
        .with_generator(SqlGenerator::new(Postgres));
    let model = order_model();
    let mut query = DataQuery::new();
    query
        .start_group()
        .filter("Customer", Operator::Like, "ac%")
        .add_or()
        .filter("Customer", Operator::Eq, Value::Null)
        .end_group()
        .start_group()
        .filter("Total", Operator::Ge, 5)
        .end_group();

    provider.select_count(&Data::new(&model), &query).unwrap();
    assert_eq!(
        provider.executor().last().text,
        "SELECT COUNT(*) FROM \"orders\" WHERE ((\"Customer\" LIKE 'ac%' OR \"Customer\" IS NULL) AND (\"Total\" >= '5'))"
    );
}

// ============================================================================
// Repository routing
// ============================================================================

#[test]
fn model_provider_type_routes_to_sql() {
    let mut builder = DataModel::builder("shop.Invoice", "invoices").with_provider_type("sql");
    builder.add_key_field("Number", ValueKind::Long);
    let model = builder.build();

    let registry = ProviderRegistry::new();
    registry
        .register(Arc::new(SqlProvider::new("sql", RecordingExecutor::empty())))
        .unwrap();
    let repository = Repository::new(Arc::new(registry));

    let mut data = Data::new(&model);
    data.set("Number", 1001i64);
    assert!(repository.insert(&mut data).unwrap().is_success());
    assert_eq!(
        repository
            .provider_for(&data, None)
            .unwrap()
            .name(),
        "sql"
    );
}
