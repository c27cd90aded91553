//! SQL backend: dialect-neutral statement generation plus a provider that
//! runs the statements through an external [`SqlExecutor`].

mod dialect;
mod generator;
mod provider;

pub use dialect::{dialect_by_name, Dialect, MySql, Postgres, SqlServer, Sqlite};
pub use generator::{SqlCommand, SqlGenerator};
pub use provider::{SqlExecutor, SqlProvider, SqlRow};
