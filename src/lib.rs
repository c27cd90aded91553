//! Schema-driven records with change tracking, composable query filters and
//! pluggable storage providers behind one repository facade.
//!
//! ```no_run
//! use datarepo::{Data, DataModel, Repository, RepositoryConfig, ValueKind};
//!
//! let mut builder = DataModel::builder("shop.Widget", "widgets");
//! builder.add_key_field("Id", ValueKind::Guid);
//! builder.add_field("Name", ValueKind::ShortString);
//! let model = builder.build();
//!
//! let repository = Repository::from_config(&RepositoryConfig::default()).unwrap();
//! let mut widget = Data::new(&model);
//! widget.set("Id", uuid::Uuid::new_v4());
//! widget.set("Name", "sprocket");
//! assert!(repository.insert(&mut widget).unwrap().is_success());
//! ```

pub mod config;
#[cfg(feature = "device")]
pub mod gate;
pub mod provider;
pub mod query;
pub mod record;
pub mod repository;
pub mod schema;
pub mod value;

pub use config::{ConfigError, RepositoryConfig};
pub use provider::{
    DataProvider, FileStreamStore, LegacyLayout, MemoryStreamStore, MemoryTableProvider,
    ProviderError, StreamStore, WriteStatus,
};
pub use query::{
    Condition, DataFilter, DataQuery, Operator, Page, QueryError, QueryToken, QueryVisitor,
    SelectOptions, SortSpec,
};
pub use record::{Data, DataList, RecordError, PROVIDER_OVERRIDE_FIELD, STREAM_PLACEHOLDER};
pub use repository::{ProviderRegistry, Repository, RepositoryError, ResolutionStep};
pub use schema::{DataModel, DataModelBuilder, FieldAttributes, FieldDef, ModelCatalog};
pub use value::{Value, ValueKind};
