use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::stream::{delete_streams, save_changed_streams, StreamStore};
use super::{check_stream_field, unsupported, DataProvider, ProviderError, WriteStatus};
use crate::query::{fold_conditions, Condition, DataFilter, DataQuery, Operator, QueryVisitor, SelectOptions};
use crate::record::{Data, DataList};
use crate::schema::DataModel;
use crate::value::Value;

type Row = BTreeMap<String, Value>;

/// storage key -> storage name -> rows in insertion order.
type Tables = HashMap<String, HashMap<String, Vec<Row>>>;

#[derive(Serialize, Deserialize)]
struct TableSnapshot {
    storage_key: String,
    storage_name: String,
    /// One JSON document per row.
    rows: Vec<String>,
}

/// In-process table engine.
///
/// Tables are created on first write and grouped by storage key, so records
/// of a partitioned model never see each other's rows. All writes serialize
/// on the table lock; reads share it.
pub struct MemoryTableProvider {
    name: String,
    tables: RwLock<Tables>,
    streams: Option<Arc<dyn StreamStore>>,
}

impl Default for MemoryTableProvider {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryTableProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: RwLock::new(HashMap::new()),
            streams: None,
        }
    }

    pub fn with_stream_store(mut self, store: Arc<dyn StreamStore>) -> Self {
        self.streams = Some(store);
        self
    }

    /// Number of rows stored for `data`'s model and storage key.
    pub fn row_count(&self, data: &Data) -> Result<usize, ProviderError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| ProviderError::LockPoisoned("table read"))?;
        Ok(table(&tables, data).map(Vec::len).unwrap_or(0))
    }

    /// Compact binary image of every table.
    pub fn snapshot(&self) -> Result<Vec<u8>, ProviderError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| ProviderError::LockPoisoned("table read"))?;
        let mut snapshots = Vec::new();
        for (storage_key, set) in tables.iter() {
            for (storage_name, rows) in set {
                let rows = rows
                    .iter()
                    .map(serde_json::to_string)
                    .collect::<Result<Vec<_>, _>>()?;
                snapshots.push(TableSnapshot {
                    storage_key: storage_key.clone(),
                    storage_name: storage_name.clone(),
                    rows,
                });
            }
        }
        Ok(bitcode::serialize(&snapshots)?)
    }

    /// Replace every table with the content of a [`snapshot`](Self::snapshot).
    pub fn restore(&self, bytes: &[u8]) -> Result<(), ProviderError> {
        let snapshots: Vec<TableSnapshot> = bitcode::deserialize(bytes)?;
        let mut restored: Tables = HashMap::new();
        for snapshot in snapshots {
            let rows = snapshot
                .rows
                .iter()
                .map(|row| serde_json::from_str(row))
                .collect::<Result<Vec<Row>, _>>()?;
            restored
                .entry(snapshot.storage_key)
                .or_default()
                .insert(snapshot.storage_name, rows);
        }
        let mut tables = self
            .tables
            .write()
            .map_err(|_| ProviderError::LockPoisoned("table write"))?;
        *tables = restored;
        Ok(())
    }

    fn stream_store(&self) -> Result<&dyn StreamStore, ProviderError> {
        self.streams
            .as_deref()
            .ok_or_else(|| unsupported(&self.name, "stream storage"))
    }

    fn insert_one(&self, tables: &mut Tables, data: &Data) -> Result<(), ProviderError> {
        let model = data.model();
        let row = build_row(model, data, |_| true)?;
        let rows = tables
            .entry(data.storage_key())
            .or_default()
            .entry(model.storage_name().to_string())
            .or_default();
        if !model.key_field_names().is_empty() {
            let key = current_key(data)?;
            if rows.iter().any(|existing| row_has_key(existing, &key)) {
                return Err(ProviderError::DuplicateKey {
                    table: model.storage_name().to_string(),
                    key: data.compute_data_key().unwrap_or_default(),
                });
            }
        }
        rows.push(row);
        Ok(())
    }

    /// `Ok(false)` when no row carries the record's key.
    fn update_one(&self, tables: &mut Tables, data: &Data) -> Result<bool, ProviderError> {
        let model = data.model();
        let key = committed_key(data)?;
        let Some(rows) = table_mut(tables, data) else {
            return Ok(false);
        };
        let Some(index) = rows.iter().position(|row| row_has_key(row, &key)) else {
            return Ok(false);
        };

        let rekeyed = model
            .key_field_names()
            .iter()
            .any(|name| data.is_field_changed(name));
        if rekeyed {
            let new_key = current_key(data)?;
            let clash = rows
                .iter()
                .enumerate()
                .any(|(i, row)| i != index && row_has_key(row, &new_key));
            if clash {
                return Err(ProviderError::DuplicateKey {
                    table: model.storage_name().to_string(),
                    key: data.compute_data_key().unwrap_or_default(),
                });
            }
        }

        let changes = build_row(model, data, |name| data.is_field_changed(name))?;
        rows[index].extend(changes);
        Ok(true)
    }

    fn delete_one(&self, tables: &mut Tables, data: &Data) -> Result<bool, ProviderError> {
        let key = committed_key(data)?;
        let Some(rows) = table_mut(tables, data) else {
            return Ok(false);
        };
        match rows.iter().position(|row| row_has_key(row, &key)) {
            Some(index) => {
                rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn matching_rows(&self, data: &Data, query: &DataQuery) -> Result<Vec<Row>, ProviderError> {
        let model = data.model();
        let patterns = like_patterns(query);
        let tables = self
            .tables
            .read()
            .map_err(|_| ProviderError::LockPoisoned("table read"))?;
        let Some(rows) = table(&tables, data) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|row| {
                let matcher = RowMatcher {
                    model,
                    row,
                    patterns: &patterns,
                };
                query.accept(&matcher).unwrap_or(true)
            })
            .cloned()
            .collect())
    }
}

fn table<'a>(tables: &'a Tables, data: &Data) -> Option<&'a Vec<Row>> {
    tables
        .get(&data.storage_key())
        .and_then(|set| set.get(data.model().storage_name()))
}

fn table_mut<'a>(tables: &'a mut Tables, data: &Data) -> Option<&'a mut Vec<Row>> {
    tables
        .get_mut(&data.storage_key())
        .and_then(|set| set.get_mut(data.model().storage_name()))
}

/// Stored fields selected by `include`, coerced to their declared kind.
fn build_row(
    model: &DataModel,
    data: &Data,
    include: impl Fn(&str) -> bool,
) -> Result<Row, ProviderError> {
    let mut row = Row::new();
    for field in model.fields().iter().filter(|field| field.is_stored()) {
        if !include(&field.name) {
            continue;
        }
        let value = data.get(&field.name).cloned().unwrap_or_default();
        let stored = field.kind.coerce(value.clone()).ok_or_else(|| {
            ProviderError::Codec(format!(
                "{}.{}: cannot store {:?} as {}",
                model.type_name(),
                field.name,
                value,
                field.kind
            ))
        })?;
        row.insert(field.name.clone(), stored);
    }
    Ok(row)
}

fn key_from(data: &Data, value_of: impl Fn(&str) -> Option<Value>) -> Result<Vec<(String, Value)>, ProviderError> {
    let model = data.model();
    let names = model.key_field_names();
    if names.is_empty() {
        return Err(ProviderError::MissingKey {
            model: model.type_name().to_string(),
        });
    }
    names
        .iter()
        .map(|name| match value_of(name) {
            Some(value) if !value.is_empty_key() => Ok((name.clone(), value)),
            _ => Err(ProviderError::MissingKey {
                model: model.type_name().to_string(),
            }),
        })
        .collect()
}

/// Key as the record carries it now.
fn current_key(data: &Data) -> Result<Vec<(String, Value)>, ProviderError> {
    key_from(data, |name| data.get(name).cloned())
}

/// Key of the stored row the record was read from.
fn committed_key(data: &Data) -> Result<Vec<(String, Value)>, ProviderError> {
    key_from(data, |name| data.committed_value(name).cloned())
}

fn row_has_key(row: &Row, key: &[(String, Value)]) -> bool {
    key.iter().all(|(name, value)| {
        row.get(name)
            .map(|stored| stored.matches(value))
            .unwrap_or(false)
    })
}

fn row_to_data(model: &Arc<DataModel>, row: &Row, projection: &[String]) -> Data {
    let mut data = Data::new(model);
    for (name, value) in row {
        let wanted = projection.is_empty()
            || projection.iter().any(|field| field.eq_ignore_ascii_case(name))
            || model.key_field_names().contains(name);
        if wanted {
            data.set(name, value.clone());
        }
    }
    data.clear_changed();
    data
}

/// Translate a SQL LIKE pattern (`%`, `_`) into an anchored regex.
fn like_regex(pattern: &str) -> Option<Regex> {
    let mut translated = String::from("(?is)^");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '%' | '_' => {
                translated.push_str(&regex::escape(&literal));
                literal.clear();
                translated.push_str(if c == '%' { ".*" } else { "." });
            }
            c => literal.push(c),
        }
    }
    translated.push_str(&regex::escape(&literal));
    translated.push('$');
    Regex::new(&translated).ok()
}

fn like_patterns(query: &DataQuery) -> HashMap<String, Regex> {
    query
        .filters()
        .iter()
        .filter(|filter| matches!(filter.operator(), Operator::Like | Operator::NotLike))
        .filter_map(|filter| {
            let pattern = filter.value().to_string();
            like_regex(&pattern).map(|regex| (pattern, regex))
        })
        .collect()
}

/// Evaluates a query tree against one stored row.
struct RowMatcher<'a> {
    model: &'a DataModel,
    row: &'a Row,
    patterns: &'a HashMap<String, Regex>,
}

impl RowMatcher<'_> {
    fn like(&self, stored: &Value, pattern: &Value) -> bool {
        if stored.is_null() {
            return false;
        }
        self.patterns
            .get(&pattern.to_string())
            .map(|regex| regex.is_match(&stored.to_string()))
            .unwrap_or(false)
    }
}

impl QueryVisitor for RowMatcher<'_> {
    type Output = bool;

    fn filter(&self, filter: &DataFilter) -> bool {
        let field = self.model.find_field(filter.name());
        let null = Value::Null;
        let stored = field
            .and_then(|field| self.row.get(&field.name))
            .unwrap_or(&null);
        let wanted = match field {
            Some(field) => field
                .kind
                .coerce(filter.value().clone())
                .unwrap_or_else(|| filter.value().clone()),
            None => filter.value().clone(),
        };

        let ordered = |accept: fn(std::cmp::Ordering) -> bool| {
            !stored.is_null()
                && !wanted.is_null()
                && stored.compare(&wanted).map(accept).unwrap_or(false)
        };
        match filter.operator() {
            Operator::Eq if wanted.is_null() => stored.is_null(),
            Operator::Eq => !stored.is_null() && stored.matches(&wanted),
            Operator::Ne if wanted.is_null() => !stored.is_null(),
            Operator::Ne => stored.is_null() || !stored.matches(&wanted),
            Operator::Gt => ordered(|o| o.is_gt()),
            Operator::Ge => ordered(|o| o.is_ge()),
            Operator::Lt => ordered(|o| o.is_lt()),
            Operator::Le => ordered(|o| o.is_le()),
            Operator::Like => self.like(stored, filter.value()),
            Operator::NotLike => !stored.is_null() && !self.like(stored, filter.value()),
            Operator::IsNull => stored.is_null(),
            Operator::IsNotNull => !stored.is_null(),
        }
    }

    fn group(&self, items: Vec<(Option<Condition>, bool)>, _nested: bool) -> bool {
        fold_conditions(items)
    }
}

impl DataProvider for MemoryTableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn select(
        &self,
        data: &Data,
        query: &DataQuery,
        options: &SelectOptions,
    ) -> Result<DataList, ProviderError> {
        let model = data.model();
        let rows = self.matching_rows(data, query)?;
        let total = rows.len();

        let mut records: Vec<Data> = rows
            .iter()
            .map(|row| row_to_data(model, &row, &[]))
            .collect();
        if !options.sort.is_empty() {
            records.sort_by(|a, b| options.sort.compare(a, b));
        }
        let page = options.page;
        let records: Vec<Data> = if page.is_paged() {
            records.into_iter().skip(page.offset()).take(page.size).collect()
        } else {
            records
        };

        let mut list = DataList::new(model);
        for record in records {
            let record = if options.fields.is_empty() {
                record
            } else {
                let row: Row = record
                    .values()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect();
                row_to_data(model, &row, &options.fields)
            };
            list.push_owned(record);
        }
        list.set_total_count(total);
        debug!(provider = %self.name, model = %model.type_name(), rows = list.len(), total, "select");
        Ok(list)
    }

    fn select_count(&self, data: &Data, query: &DataQuery) -> Result<usize, ProviderError> {
        Ok(self.matching_rows(data, query)?.len())
    }

    fn insert(&self, list: &mut DataList) -> WriteStatus {
        let mut status = WriteStatus::SUCCESS;
        let mut tables = match self.tables.write() {
            Ok(tables) => tables,
            Err(_) => {
                warn!(provider = %self.name, "table lock poisoned during insert");
                return WriteStatus::EXCEPTION;
            }
        };
        for data in list.iter_mut() {
            if let Err(err) = self.insert_one(&mut tables, data) {
                warn!(provider = %self.name, model = %data.model().type_name(), error = %err, "insert failed");
                status |= WriteStatus::EXCEPTION;
                break;
            }
            status |= save_changed_streams(self.streams.as_deref(), data);
            data.clear_changed();
        }
        status
    }

    fn update(&self, list: &mut DataList) -> WriteStatus {
        let mut status = WriteStatus::SUCCESS;
        let mut tables = match self.tables.write() {
            Ok(tables) => tables,
            Err(_) => {
                warn!(provider = %self.name, "table lock poisoned during update");
                return WriteStatus::EXCEPTION;
            }
        };
        for data in list.iter_mut() {
            if !data.is_changed() {
                status |= WriteStatus::EMPTY;
                continue;
            }
            match self.update_one(&mut tables, data) {
                Ok(true) => {
                    status |= save_changed_streams(self.streams.as_deref(), data);
                    data.clear_changed();
                }
                Ok(false) => {
                    debug!(provider = %self.name, model = %data.model().type_name(), "update matched no row");
                    status |= WriteStatus::NOT_FOUND;
                }
                Err(err) => {
                    warn!(provider = %self.name, model = %data.model().type_name(), error = %err, "update failed");
                    status |= WriteStatus::EXCEPTION;
                }
            }
        }
        status
    }

    fn delete(&self, list: &mut DataList) -> WriteStatus {
        let mut status = WriteStatus::SUCCESS;
        let mut tables = match self.tables.write() {
            Ok(tables) => tables,
            Err(_) => {
                warn!(provider = %self.name, "table lock poisoned during delete");
                return WriteStatus::EXCEPTION;
            }
        };
        for data in list.iter_mut() {
            match self.delete_one(&mut tables, data) {
                Ok(true) => {
                    status |= delete_streams(self.streams.as_deref(), data);
                    data.clear_changed();
                }
                Ok(false) => {
                    debug!(provider = %self.name, model = %data.model().type_name(), "delete matched no row");
                    status |= WriteStatus::NOT_FOUND;
                }
                Err(err) => {
                    warn!(provider = %self.name, model = %data.model().type_name(), error = %err, "delete failed");
                    status |= WriteStatus::EXCEPTION;
                }
            }
        }
        status
    }

    fn stream_open(&self, data: &Data, field: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        check_stream_field(data, field)?;
        self.stream_store()?.open(&data.stream_path(), field)
    }

    fn stream_save(&self, data: &Data, field: &str, content: &[u8]) -> Result<bool, ProviderError> {
        check_stream_field(data, field)?;
        self.stream_store()?.save(&data.stream_path(), field, content)
    }

    fn stream_delete(&self, data: &Data, field: &str) -> Result<bool, ProviderError> {
        check_stream_field(data, field)?;
        self.stream_store()?.delete(&data.stream_path(), field)
    }

    fn stream_url(&self, data: &Data, field: &str) -> Result<Option<String>, ProviderError> {
        check_stream_field(data, field)?;
        Ok(self.stream_store()?.url(&data.stream_path(), field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryStreamStore;
    use crate::query::SortSpec;
    use crate::schema::attribute;
    use crate::value::ValueKind;

    fn widget_model() -> Arc<DataModel> {
        let mut builder = DataModel::builder("t.Widget", "widgets");
        builder.add_key_field("Id", ValueKind::Int);
        builder.add_field("Name", ValueKind::ShortString);
        builder.add_nullable_field("Weight", ValueKind::Double);
        builder.add_field("Manual", ValueKind::Stream);
        builder.build()
    }

    fn widget(model: &Arc<DataModel>, id: i32, name: &str, weight: f64) -> Data {
        let mut data = Data::new(model);
        data.set("Id", id);
        data.set("Name", name);
        data.set("Weight", weight);
        data
    }

    fn seeded() -> (MemoryTableProvider, Arc<DataModel>) {
        let provider = MemoryTableProvider::default();
        let model = widget_model();
        let mut list = DataList::new(&model);
        for (id, name, weight) in [(1, "bolt", 1.5), (2, "nut", 0.5), (3, "bracket", 12.0)] {
            list.push(widget(&model, id, name, weight)).unwrap();
        }
        assert!(provider.insert(&mut list).is_success());
        (provider, model)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    #[test]
    fn insert_commits_records() {
        let provider = MemoryTableProvider::default();
        let model = widget_model();
        let mut list = DataList::single(widget(&model, 1, "bolt", 1.0));
        assert!(provider.insert(&mut list).is_success());
        assert!(!list[0].is_changed());
        assert_eq!(list[0].data_key(), Some("1"));
    }

    #[test]
    fn insert_stops_at_first_failure() {
        let (provider, model) = seeded();
        let mut list = DataList::new(&model);
        list.push(widget(&model, 9, "fresh", 1.0)).unwrap();
        list.push(widget(&model, 1, "duplicate", 1.0)).unwrap();
        list.push(widget(&model, 10, "skipped", 1.0)).unwrap();

        assert_eq!(provider.insert(&mut list), WriteStatus::EXCEPTION);
        assert!(!list[0].is_changed());
        assert!(list[2].is_changed());
        assert_eq!(provider.row_count(&list[0]).unwrap(), 4);
    }

    #[test]
    fn insert_without_key_fails() {
        let provider = MemoryTableProvider::default();
        let model = widget_model();
        let mut data = Data::new(&model);
        data.set("Name", "keyless");
        assert_eq!(
            provider.insert(&mut DataList::single(data)),
            WriteStatus::EXCEPTION
        );
    }

    #[test]
    fn update_without_changes_is_empty() {
        let (provider, model) = seeded();
        let mut list = provider
            .select(&Data::new(&model), &DataQuery::by_property("Id", 2), &SelectOptions::new())
            .unwrap();
        assert_eq!(provider.update(&mut list), WriteStatus::EMPTY);
    }

    #[test]
    fn update_of_missing_row_is_not_found_and_others_proceed() {
        let (provider, model) = seeded();
        let mut ghost = widget(&model, 77, "ghost", 1.0);
        ghost.clear_changed();
        ghost.set("Name", "still ghost");
        let mut existing = widget(&model, 2, "nut", 0.5);
        existing.clear_changed();
        existing.set("Name", "hex nut");

        let mut list = DataList::new(&model);
        list.push(ghost).unwrap();
        list.push(existing).unwrap();
        assert_eq!(provider.update(&mut list), WriteStatus::NOT_FOUND);

        let found = provider
            .select(&Data::new(&model), &DataQuery::by_property("Id", 2), &SelectOptions::new())
            .unwrap();
        assert_eq!(found[0].get_str("Name"), Some("hex nut"));
    }

    #[test]
    fn update_can_rename_the_key() {
        let (provider, model) = seeded();
        let mut list = provider
            .select(&Data::new(&model), &DataQuery::by_property("Id", 3), &SelectOptions::new())
            .unwrap();
        list[0].set("Id", 30);
        assert!(provider.update(&mut list).is_success());
        assert_eq!(list[0].data_key(), Some("30"));
        let count = provider
            .select_count(&Data::new(&model), &DataQuery::by_property("Id", 30))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn update_into_an_existing_key_fails() {
        let (provider, model) = seeded();
        let mut list = provider
            .select(&Data::new(&model), &DataQuery::by_property("Id", 3), &SelectOptions::new())
            .unwrap();
        list[0].set("Id", 1);
        assert_eq!(provider.update(&mut list), WriteStatus::EXCEPTION);
        assert!(list[0].is_changed());
    }

    #[test]
    fn delete_is_best_effort() {
        let (provider, model) = seeded();
        let mut list = DataList::new(&model);
        let mut ghost = widget(&model, 77, "ghost", 1.0);
        ghost.clear_changed();
        let mut bolt = widget(&model, 1, "bolt", 1.5);
        bolt.clear_changed();
        list.push(ghost).unwrap();
        list.push(bolt).unwrap();

        assert_eq!(provider.delete(&mut list), WriteStatus::NOT_FOUND);
        assert_eq!(provider.row_count(&Data::new(&model)).unwrap(), 2);
    }

    // ========================================================================
    // Reads
    // ========================================================================

    #[test]
    fn select_filters_sorts_and_pages() {
        let (provider, model) = seeded();
        let mut query = DataQuery::new();
        query.filter("Weight", Operator::Ge, 1.0);
        let options = SelectOptions::new()
            .with_sort(SortSpec::parse("Weight desc"))
            .with_page(1, 1);

        let list = provider.select(&Data::new(&model), &query, &options).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.total_count(), 2);
        assert_eq!(list[0].get_str("Name"), Some("bracket"));
    }

    #[test]
    fn like_and_or_groups() {
        let (provider, model) = seeded();
        let mut query = DataQuery::new();
        query
            .start_group()
            .filter("Name", Operator::Like, "b%")
            .add_and()
            .filter("Weight", Operator::Lt, 2)
            .end_group()
            .add_or()
            .start_group()
            .filter("Name", Operator::Eq, "NUT")
            .end_group();
        let list = provider
            .select(&Data::new(&model), &query, &SelectOptions::new())
            .unwrap();
        let names: Vec<_> = list.iter().filter_map(|data| data.get_str("Name")).collect();
        assert_eq!(names, ["bolt"]);
    }

    #[test]
    fn null_filters() {
        let (provider, model) = seeded();
        let mut data = Data::new(&model);
        data.set("Id", 4);
        data.set("Name", "washer");
        assert!(provider.insert(&mut DataList::single(data)).is_success());

        let mut query = DataQuery::new();
        query.add_filter(DataFilter::is_null("Weight"));
        assert_eq!(provider.select_count(&Data::new(&model), &query).unwrap(), 1);

        let mut query = DataQuery::new();
        query.add_filter(DataFilter::is_not_null("Weight"));
        assert_eq!(provider.select_count(&Data::new(&model), &query).unwrap(), 3);
    }

    #[test]
    fn projection_keeps_key_fields() {
        let (provider, model) = seeded();
        let options = SelectOptions::new().with_fields(["Name"]);
        let list = provider
            .select(&Data::new(&model), &DataQuery::by_property("Id", 1), &options)
            .unwrap();
        assert_eq!(list[0].get_str("Name"), Some("bolt"));
        assert_eq!(list[0].get("Id"), Some(&Value::Int(1)));
        assert_eq!(list[0].get("Weight"), None);
    }

    #[test]
    fn storage_keys_partition_tables() {
        let provider = MemoryTableProvider::default();
        let mut builder = DataModel::builder("t.Note", "notes");
        builder.add_key_field("Id", ValueKind::Int);
        builder.add_field("Tenant", ValueKind::ShortString);
        builder.set_attribute("Tenant", attribute::STORAGE_KEY, "true");
        let model = builder.build();

        for tenant in ["a", "b"] {
            let mut data = Data::new(&model);
            data.set("Id", 1);
            data.set("Tenant", tenant);
            assert!(provider.insert(&mut DataList::single(data)).is_success());
        }
        let mut template = Data::new(&model);
        template.set("Tenant", "a");
        assert_eq!(provider.select_count(&template, &DataQuery::new()).unwrap(), 1);
    }

    // ========================================================================
    // Streams and snapshots
    // ========================================================================

    #[test]
    fn stream_fields_go_to_the_store() {
        let store = Arc::new(MemoryStreamStore::new());
        let provider = MemoryTableProvider::default().with_stream_store(store.clone());
        let model = widget_model();
        let mut data = widget(&model, 1, "bolt", 1.0);
        data.set("Manual", Value::Stream(b"torque".to_vec()));

        assert!(provider.insert(&mut DataList::single(data.clone())).is_success());
        assert_eq!(
            provider.stream_open(&data, "Manual").unwrap(),
            Some(b"torque".to_vec())
        );
        assert!(matches!(
            provider.stream_open(&data, "Name"),
            Err(ProviderError::NotAStream { .. })
        ));
    }

    #[test]
    fn stream_failure_keeps_the_row() {
        let provider = MemoryTableProvider::default();
        let model = widget_model();
        let mut data = widget(&model, 1, "bolt", 1.0);
        data.set("Manual", Value::Stream(b"torque".to_vec()));

        let status = provider.insert(&mut DataList::single(data));
        assert_eq!(status, WriteStatus::STREAM_FAILURE);
        assert_eq!(provider.row_count(&Data::new(&model)).unwrap(), 1);
    }

    #[test]
    fn snapshot_round_trips_tables() {
        let (provider, model) = seeded();
        let bytes = provider.snapshot().unwrap();

        let restored = MemoryTableProvider::default();
        restored.restore(&bytes).unwrap();
        let list = restored
            .select(&Data::new(&model), &DataQuery::by_property("Id", 3), &SelectOptions::new())
            .unwrap();
        assert_eq!(list[0].get("Weight"), Some(&Value::Double(12.0)));
    }

    #[test]
    fn like_translation_escapes_regex_syntax() {
        let regex = like_regex("a.b%_").unwrap();
        assert!(regex.is_match("a.bcdX"));
        assert!(!regex.is_match("axbcdX"));
        assert!(regex.is_match("A.B!"));
    }
}
