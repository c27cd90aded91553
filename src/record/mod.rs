//! Records and record lists.

mod data;
mod error;
mod list;
mod text;

pub use data::{Data, PROVIDER_OVERRIDE_FIELD};
pub use error::RecordError;
pub use list::DataList;
pub use text::STREAM_PLACEHOLDER;
