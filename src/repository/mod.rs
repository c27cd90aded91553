//! Provider dispatch.
//!
//! [`Repository`] is the facade callers use; [`ProviderRegistry`] holds the
//! named providers and decides which one serves a record.

mod error;
mod registry;
mod repository;

pub use error::RepositoryError;
pub use registry::{ProviderFactory, ProviderRegistry, ResolutionStep};
pub use repository::Repository;
