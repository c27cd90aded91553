use super::dialect::{Dialect, SqlServer};
use crate::provider::ProviderError;
use crate::query::{Condition, DataFilter, DataQuery, Operator, QueryVisitor, SelectOptions};
use crate::record::Data;
use crate::schema::DataModel;
use crate::value::Value;

/// A dialect-specific statement and its parameters in marker order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    pub text: String,
    pub params: Vec<(String, Value)>,
}

impl SqlCommand {
    fn new(text: String) -> Self {
        Self {
            text,
            params: Vec::new(),
        }
    }
}

/// Builds statements for one model through a [`Dialect`].
pub struct SqlGenerator {
    dialect: Box<dyn Dialect>,
}

impl Default for SqlGenerator {
    fn default() -> Self {
        Self::new(SqlServer)
    }
}

impl SqlGenerator {
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self {
            dialect: Box::new(dialect),
        }
    }

    pub fn with_boxed(dialect: Box<dyn Dialect>) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn finish(&self, skeleton: String, params: Vec<(String, Value)>) -> SqlCommand {
        SqlCommand {
            text: self.dialect.rewrite(&skeleton),
            params,
        }
    }

    pub fn create_table(&self, model: &DataModel) -> SqlCommand {
        let mut columns: Vec<String> = model
            .fields()
            .iter()
            .filter(|field| field.is_stored())
            .map(|field| {
                let null = if field.is_key() && !field.attributes.nullable {
                    "NOT NULL"
                } else {
                    "NULL"
                };
                format!("{} DefinitionType.{}. {}", bracket(&field.name), field.kind.name(), null)
            })
            .collect();
        let keys = model.key_field_names();
        if !keys.is_empty() {
            let keys: Vec<String> = keys.iter().map(|name| bracket(name)).collect();
            columns.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }
        let skeleton = format!("CREATE TABLE {} ({})", bracket(model.storage_name()), columns.join(", "));
        self.finish(skeleton, Vec::new())
    }

    /// One `ALTER TABLE` per stored field missing from `existing`
    /// (compared case-insensitively). Added columns are always nullable.
    pub fn add_missing_columns(&self, model: &DataModel, existing: &[String]) -> Vec<SqlCommand> {
        model
            .fields()
            .iter()
            .filter(|field| field.is_stored())
            .filter(|field| !existing.iter().any(|column| column.eq_ignore_ascii_case(&field.name)))
            .map(|field| {
                let skeleton = format!(
                    "ALTER TABLE {} ADD {} DefinitionType.{}. NULL",
                    bracket(model.storage_name()),
                    bracket(&field.name),
                    field.kind.name()
                );
                self.finish(skeleton, Vec::new())
            })
            .collect()
    }

    /// `WHERE ...` for the query plus the record's storage key, or an empty
    /// string when there is nothing to filter on.
    pub fn where_clause(&self, data: &Data, query: &DataQuery) -> String {
        let model = data.model();
        let renderer = FilterRenderer { model };
        let mut parts = Vec::new();
        if let Some(field) = model.storage_key_field() {
            let storage_key = data.storage_key();
            if !storage_key.is_empty() {
                parts.push(renderer.filter(&DataFilter::eq(field.name.clone(), storage_key)));
            }
        }
        if let Some(rendered) = query.accept(&renderer) {
            parts.push(rendered);
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }

    pub fn select(&self, data: &Data, query: &DataQuery, options: &SelectOptions) -> SqlCommand {
        let model = data.model();
        let columns: Vec<String> = projection(model, &options.fields)
            .iter()
            .map(|name| bracket(name))
            .collect();
        let mut skeleton = format!(
            "SELECT {} FROM {}{}",
            columns.join(", "),
            bracket(model.storage_name()),
            self.where_clause(data, query)
        );

        let order: Vec<String> = options
            .sort
            .fields()
            .iter()
            .filter_map(|sort| {
                let field = model.find_field(&sort.name)?;
                let direction = if sort.descending { " DESC" } else { "" };
                Some(format!("{}{}", bracket(&field.name), direction))
            })
            .collect();
        if !order.is_empty() {
            skeleton.push_str(&format!(" ORDER BY {}", order.join(", ")));
        }

        let mut command = self.finish(skeleton, Vec::new());
        let page = options.page;
        if page.is_paged() {
            if order.is_empty() && self.dialect.paging_requires_order() {
                command.text.push_str(" ORDER BY (SELECT NULL)");
            }
            command.text.push(' ');
            command.text.push_str(&self.dialect.paging(page.offset(), page.size));
        }
        command
    }

    pub fn count(&self, data: &Data, query: &DataQuery) -> SqlCommand {
        let skeleton = format!(
            "SELECT COUNT(*) FROM {}{}",
            bracket(data.model().storage_name()),
            self.where_clause(data, query)
        );
        self.finish(skeleton, Vec::new())
    }

    /// Every stored field of the record.
    pub fn insert(&self, data: &Data) -> Result<SqlCommand, ProviderError> {
        let model = data.model();
        let mut columns = Vec::new();
        let mut markers = Vec::new();
        let mut params = Vec::new();
        for field in model.fields().iter().filter(|field| field.is_stored()) {
            let name = param_name(&field.name);
            columns.push(bracket(&field.name));
            markers.push(format!("@{}", name));
            params.push((name, stored_value(model, data, &field.name)?));
        }
        let skeleton = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            bracket(model.storage_name()),
            columns.join(", "),
            markers.join(", ")
        );
        Ok(self.finish(skeleton, params))
    }

    /// Changed stored fields keyed by the committed key. `None` when no
    /// stored field changed.
    pub fn update(&self, data: &Data) -> Result<Option<SqlCommand>, ProviderError> {
        let model = data.model();
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for field in model.fields().iter().filter(|field| field.is_stored()) {
            if !data.is_field_changed(&field.name) {
                continue;
            }
            let name = param_name(&field.name);
            assignments.push(format!("{} = @{}", bracket(&field.name), name));
            params.push((name, stored_value(model, data, &field.name)?));
        }
        if assignments.is_empty() {
            return Ok(None);
        }
        let key = self.key_predicate(data, &mut params)?;
        let skeleton = format!(
            "UPDATE {} SET {} WHERE {}",
            bracket(model.storage_name()),
            assignments.join(", "),
            key
        );
        Ok(Some(self.finish(skeleton, params)))
    }

    pub fn delete(&self, data: &Data) -> Result<SqlCommand, ProviderError> {
        let mut params = Vec::new();
        let key = self.key_predicate(data, &mut params)?;
        let skeleton = format!("DELETE FROM {} WHERE {}", bracket(data.model().storage_name()), key);
        Ok(self.finish(skeleton, params))
    }

    fn key_predicate(
        &self,
        data: &Data,
        params: &mut Vec<(String, Value)>,
    ) -> Result<String, ProviderError> {
        let model = data.model();
        let missing = || ProviderError::MissingKey {
            model: model.type_name().to_string(),
        };
        if model.key_field_names().is_empty() {
            return Err(missing());
        }
        let mut predicates = Vec::new();
        for name in model.key_field_names() {
            let value = data
                .committed_value(name)
                .filter(|value| !value.is_empty_key())
                .ok_or_else(missing)?;
            let kind = model.value_kind(name);
            let value = kind
                .and_then(|kind| kind.coerce(value.clone()))
                .unwrap_or_else(|| value.clone());
            let param = format!("k_{}", param_name(name));
            predicates.push(format!("{} = @{}", bracket(name), param));
            params.push((param, value));
        }
        Ok(predicates.join(" AND "))
    }
}

/// Stored field names to read: the requested ones the model stores plus
/// every key field, or all stored fields when nothing was requested.
fn projection(model: &DataModel, requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return model.field_names().to_vec();
    }
    model
        .field_names()
        .iter()
        .filter(|name| {
            model.key_field_names().contains(name)
                || requested.iter().any(|wanted| wanted.eq_ignore_ascii_case(name))
        })
        .cloned()
        .collect()
}

fn param_name(field: &str) -> String {
    field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn stored_value(model: &DataModel, data: &Data, name: &str) -> Result<Value, ProviderError> {
    let value = data.get(name).cloned().unwrap_or_default();
    match model.value_kind(name) {
        Some(kind) => kind.coerce(value.clone()).ok_or_else(|| {
            ProviderError::Codec(format!(
                "{}.{}: cannot store {:?} as {}",
                model.type_name(),
                name,
                value,
                kind
            ))
        }),
        None => Ok(value),
    }
}

/// Skeleton identifier. A `]` inside the name is doubled.
fn bracket(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Renders filters as `[name] op 'value'` with single quotes doubled.
struct FilterRenderer<'a> {
    model: &'a DataModel,
}

fn literal(value: &Value) -> String {
    let text = match value {
        Value::Bool(flag) => (if *flag { "1" } else { "0" }).to_string(),
        other => other.to_string(),
    };
    format!("'{}'", text.replace('\'', "''"))
}

impl QueryVisitor for FilterRenderer<'_> {
    type Output = String;

    fn filter(&self, filter: &DataFilter) -> String {
        let name = self
            .model
            .find_field(filter.name())
            .map(|field| field.name.as_str())
            .unwrap_or(filter.name());
        let name = bracket(name);
        let value = filter.value();
        match filter.operator() {
            Operator::IsNull => format!("{} IS NULL", name),
            Operator::IsNotNull => format!("{} IS NOT NULL", name),
            Operator::Eq if value.is_null() => format!("{} IS NULL", name),
            Operator::Ne if value.is_null() => format!("{} IS NOT NULL", name),
            operator => format!("{} {} {}", name, operator, literal(value)),
        }
    }

    fn group(&self, items: Vec<(Option<Condition>, String)>, _nested: bool) -> String {
        let mut text = String::from("(");
        for (condition, rendered) in items {
            if let Some(condition) = condition {
                text.push(' ');
                text.push_str(condition.as_str());
                text.push(' ');
            }
            text.push_str(&rendered);
        }
        text.push(')');
        text
    }
}
