//! SQL dialects.
//!
//! The generator writes one dialect-neutral skeleton: identifiers as
//! `[name]` (a `]` inside the name doubled), column types as `DefinitionType.<Kind>.` and parameters as
//! `@name`. A [`Dialect`] rewrites those tokens into its own syntax. Quoted
//! string literals are copied through untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::value::ValueKind;

static SKELETON_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'(?:[^']|'')*'|\[((?:[^\]]|\]\])+)\]|DefinitionType\.(\w+)\.|@(\w+)").unwrap()
});

pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quote an identifier.
    fn quote(&self, identifier: &str) -> String;

    fn type_name(&self, kind: ValueKind) -> &'static str;

    /// Marker for the parameter `name`, the `position`-th (1-based) in the
    /// statement.
    fn parameter(&self, name: &str, position: usize) -> String;

    /// Clause appended after `ORDER BY` to select one page.
    fn paging(&self, offset: usize, size: usize) -> String {
        format!("LIMIT {} OFFSET {}", size, offset)
    }

    /// Whether a paged select needs an `ORDER BY` even when unsorted.
    fn paging_requires_order(&self) -> bool {
        false
    }

    /// Translate a skeleton statement into this dialect.
    fn rewrite(&self, skeleton: &str) -> String {
        let mut position = 0;
        SKELETON_TOKENS
            .replace_all(skeleton, |caps: &Captures| {
                if let Some(identifier) = caps.get(1) {
                    self.quote(&identifier.as_str().replace("]]", "]"))
                } else if let Some(kind) = caps.get(2) {
                    match ValueKind::from_name(kind.as_str()) {
                        Some(kind) => self.type_name(kind).to_string(),
                        None => caps[0].to_string(),
                    }
                } else if let Some(name) = caps.get(3) {
                    position += 1;
                    self.parameter(name.as_str(), position)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

fn quote_with(identifier: &str, open: char, close: char) -> String {
    let escaped = identifier.replace(close, &format!("{close}{close}"));
    format!("{open}{escaped}{close}")
}

/// Microsoft SQL Server. The skeleton is close to native T-SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote(&self, identifier: &str) -> String {
        quote_with(identifier, '[', ']')
    }

    fn type_name(&self, kind: ValueKind) -> &'static str {
        match kind {
            ValueKind::ShortString => "NVARCHAR(255)",
            ValueKind::LongString | ValueKind::Json => "NVARCHAR(MAX)",
            ValueKind::Guid => "UNIQUEIDENTIFIER",
            ValueKind::Int => "INT",
            ValueKind::Long => "BIGINT",
            ValueKind::Double => "FLOAT",
            ValueKind::Bytes | ValueKind::Stream => "VARBINARY(MAX)",
            ValueKind::Bool => "BIT",
            ValueKind::DateTime => "DATETIME2",
        }
    }

    fn parameter(&self, name: &str, _position: usize) -> String {
        format!("@{}", name)
    }

    fn paging(&self, offset: usize, size: usize) -> String {
        format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, size)
    }

    fn paging_requires_order(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote(&self, identifier: &str) -> String {
        quote_with(identifier, '"', '"')
    }

    fn type_name(&self, kind: ValueKind) -> &'static str {
        match kind {
            ValueKind::ShortString
            | ValueKind::LongString
            | ValueKind::Guid
            | ValueKind::DateTime
            | ValueKind::Json => "TEXT",
            ValueKind::Int | ValueKind::Long | ValueKind::Bool => "INTEGER",
            ValueKind::Double => "REAL",
            ValueKind::Bytes | ValueKind::Stream => "BLOB",
        }
    }

    fn parameter(&self, _name: &str, position: usize) -> String {
        format!("?{}", position)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote(&self, identifier: &str) -> String {
        quote_with(identifier, '"', '"')
    }

    fn type_name(&self, kind: ValueKind) -> &'static str {
        match kind {
            ValueKind::ShortString => "VARCHAR(255)",
            ValueKind::LongString => "TEXT",
            ValueKind::Json => "JSONB",
            ValueKind::Guid => "UUID",
            ValueKind::Int => "INTEGER",
            ValueKind::Long => "BIGINT",
            ValueKind::Double => "DOUBLE PRECISION",
            ValueKind::Bytes | ValueKind::Stream => "BYTEA",
            ValueKind::Bool => "BOOLEAN",
            ValueKind::DateTime => "TIMESTAMPTZ",
        }
    }

    fn parameter(&self, _name: &str, position: usize) -> String {
        format!("${}", position)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, identifier: &str) -> String {
        quote_with(identifier, '`', '`')
    }

    fn type_name(&self, kind: ValueKind) -> &'static str {
        match kind {
            ValueKind::ShortString => "VARCHAR(255)",
            ValueKind::LongString => "LONGTEXT",
            ValueKind::Json => "JSON",
            ValueKind::Guid => "CHAR(36)",
            ValueKind::Int => "INT",
            ValueKind::Long => "BIGINT",
            ValueKind::Double => "DOUBLE",
            ValueKind::Bytes | ValueKind::Stream => "LONGBLOB",
            ValueKind::Bool => "TINYINT(1)",
            ValueKind::DateTime => "DATETIME(6)",
        }
    }

    fn parameter(&self, _name: &str, _position: usize) -> String {
        "?".to_string()
    }
}

/// Look a dialect up by its configuration name.
pub fn dialect_by_name(name: &str) -> Option<Box<dyn Dialect>> {
    let dialect: Box<dyn Dialect> = match name.trim().to_ascii_lowercase().as_str() {
        "sqlserver" | "mssql" => Box::new(SqlServer),
        "sqlite" => Box::new(Sqlite),
        "postgres" | "postgresql" => Box::new(Postgres),
        "mysql" | "mariadb" => Box::new(MySql),
        _ => return None,
    };
    Some(dialect)
}
