//! Query filters.
//!
//! A [`DataQuery`] is a small expression tree of filter triples, groups and
//! AND/OR conditions. Backends compile it with a [`QueryVisitor`] of their
//! own, so one query API serves every provider.

mod data_query;
mod filter;
mod options;

use thiserror::Error;

pub use data_query::{
    fold_conditions, Clause, Condition, DataQuery, QueryNode, QueryToken, QueryVisitor,
};
pub use filter::{DataFilter, Operator};
pub use options::{Page, SelectOptions, SortField, SortSpec};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown filter operator {0:?}")]
    UnknownOperator(String),
}
