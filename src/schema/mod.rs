//! Schema models: per-entity field catalogs.
//!
//! A model declares named fields with a [`ValueKind`](crate::ValueKind) and
//! typed attributes (primary key, nullable, encrypted, storage key). It
//! derives record keys and stream paths from the key fields.

mod catalog;
mod field;
mod model;
mod untyped;

pub use catalog::ModelCatalog;
pub use field::{attribute, parse_flag, FieldAttributes, FieldDef};
pub use model::{DataModel, DataModelBuilder, StreamPathFn, DEFAULT_KEY_SEPARATOR};
