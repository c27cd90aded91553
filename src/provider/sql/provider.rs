use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::generator::{SqlCommand, SqlGenerator};
use crate::provider::stream::{delete_streams, save_changed_streams, StreamStore};
use crate::provider::{check_stream_field, unsupported, DataProvider, ProviderError, WriteStatus};
use crate::query::{DataQuery, SelectOptions};
use crate::record::{Data, DataList};
use crate::schema::DataModel;
use crate::value::Value;

/// One result row keyed by column name.
pub type SqlRow = BTreeMap<String, Value>;

/// Connection to a SQL database. Drivers live outside this crate.
pub trait SqlExecutor: Send + Sync {
    /// Run a statement, returning the number of affected rows.
    fn execute(&self, command: &SqlCommand) -> Result<usize, ProviderError>;

    fn query(&self, command: &SqlCommand) -> Result<Vec<SqlRow>, ProviderError>;

    /// Column names of `table`, or `None` when the table does not exist.
    fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, ProviderError>;
}

/// Tabular provider over a [`SqlExecutor`].
///
/// Tables are created, and missing columns added, the first time a model
/// is used through this provider.
pub struct SqlProvider<E: SqlExecutor> {
    name: String,
    executor: E,
    generator: SqlGenerator,
    ensured: Mutex<HashSet<String>>,
    streams: Option<Arc<dyn StreamStore>>,
}

impl<E: SqlExecutor> SqlProvider<E> {
    pub fn new(name: impl Into<String>, executor: E) -> Self {
        Self {
            name: name.into(),
            executor,
            generator: SqlGenerator::default(),
            ensured: Mutex::new(HashSet::new()),
            streams: None,
        }
    }

    pub fn with_generator(mut self, generator: SqlGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_stream_store(mut self, store: Arc<dyn StreamStore>) -> Self {
        self.streams = Some(store);
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn generator(&self) -> &SqlGenerator {
        &self.generator
    }

    /// Create the model's table or add its missing columns, once per table.
    pub fn ensure_table(&self, model: &DataModel) -> Result<(), ProviderError> {
        let mut ensured = self
            .ensured
            .lock()
            .map_err(|_| ProviderError::LockPoisoned("ensure table"))?;
        if ensured.contains(model.storage_name()) {
            return Ok(());
        }
        match self.executor.table_columns(model.storage_name())? {
            None => {
                self.executor.execute(&self.generator.create_table(model))?;
                info!(provider = %self.name, table = %model.storage_name(), "created table");
            }
            Some(columns) => {
                for command in self.generator.add_missing_columns(model, &columns) {
                    self.executor.execute(&command)?;
                    info!(provider = %self.name, table = %model.storage_name(), sql = %command.text, "added column");
                }
            }
        }
        ensured.insert(model.storage_name().to_string());
        Ok(())
    }

    fn stream_store(&self) -> Result<&dyn StreamStore, ProviderError> {
        self.streams
            .as_deref()
            .ok_or_else(|| unsupported(&self.name, "stream storage"))
    }

    fn prepare(&self, list: &DataList, operation: &str) -> Result<(), WriteStatus> {
        self.ensure_table(list.model()).map_err(|err| {
            warn!(provider = %self.name, operation, error = %err, "table preparation failed");
            WriteStatus::EXCEPTION
        })
    }

    fn fail(&self, data: &Data, operation: &str, err: &ProviderError) -> WriteStatus {
        warn!(
            provider = %self.name,
            model = %data.model().type_name(),
            operation,
            error = %err,
            "write failed"
        );
        WriteStatus::EXCEPTION
    }
}

fn row_to_record(model: &Arc<DataModel>, row: SqlRow) -> Data {
    let mut data = Data::new(model);
    for (column, value) in row {
        match model.find_field(&column) {
            Some(field) => {
                let value = field.kind.coerce(value.clone()).unwrap_or(value);
                data.set(&field.name, value);
            }
            None => data.set_extended(&column, value),
        }
    }
    data.clear_changed();
    data
}

fn count_of(rows: &[SqlRow]) -> usize {
    rows.first()
        .and_then(|row| row.values().next())
        .and_then(|value| match value {
            Value::String(text) => text.trim().parse().ok(),
            other => other.as_i64().and_then(|n| usize::try_from(n).ok()),
        })
        .unwrap_or(0)
}

impl<E: SqlExecutor> DataProvider for SqlProvider<E> {
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
        self.ensure_table(model)?;
        let command = self.generator.select(data, query, options);
        debug!(provider = %self.name, sql = %command.text, "select");
        let rows = self.executor.query(&command)?;

        let total = if options.page.is_paged() {
            count_of(&self.executor.query(&self.generator.count(data, query))?)
        } else {
            rows.len()
        };
        let mut list = DataList::new(model);
        for row in rows {
            list.push_owned(row_to_record(model, row));
        }
        list.set_total_count(total);
        Ok(list)
    }

    fn select_count(&self, data: &Data, query: &DataQuery) -> Result<usize, ProviderError> {
        self.ensure_table(data.model())?;
        let rows = self.executor.query(&self.generator.count(data, query))?;
        Ok(count_of(&rows))
    }

    fn insert(&self, list: &mut DataList) -> WriteStatus {
        if let Err(status) = self.prepare(list, "insert") {
            return status;
        }
        let mut status = WriteStatus::SUCCESS;
        for data in list.iter_mut() {
            let written = self
                .generator
                .insert(data)
                .and_then(|command| self.executor.execute(&command));
            if let Err(err) = written {
                status |= self.fail(data, "insert", &err);
                break;
            }
            status |= save_changed_streams(self.streams.as_deref(), data);
            data.clear_changed();
        }
        status
    }

    fn update(&self, list: &mut DataList) -> WriteStatus {
        if let Err(status) = self.prepare(list, "update") {
            return status;
        }
        let mut status = WriteStatus::SUCCESS;
        for data in list.iter_mut() {
            if !data.is_changed() {
                status |= WriteStatus::EMPTY;
                continue;
            }
            let affected = self.generator.update(data).and_then(|command| match command {
                Some(command) => self.executor.execute(&command).map(Some),
                None => Ok(None),
            });
            match affected {
                Ok(Some(0)) => {
                    debug!(provider = %self.name, model = %data.model().type_name(), "update matched no row");
                    status |= WriteStatus::NOT_FOUND;
                }
                Ok(_) => {
                    status |= save_changed_streams(self.streams.as_deref(), data);
                    data.clear_changed();
                }
                Err(err) => status |= self.fail(data, "update", &err),
            }
        }
        status
    }

    fn delete(&self, list: &mut DataList) -> WriteStatus {
        if let Err(status) = self.prepare(list, "delete") {
            return status;
        }
        let mut status = WriteStatus::SUCCESS;
        for data in list.iter_mut() {
            let affected = self
                .generator
                .delete(data)
                .and_then(|command| self.executor.execute(&command));
            match affected {
                Ok(0) => status |= WriteStatus::NOT_FOUND,
                Ok(_) => {
                    status |= delete_streams(self.streams.as_deref(), data);
                    data.clear_changed();
                }
                Err(err) => status |= self.fail(data, "delete", &err),
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
