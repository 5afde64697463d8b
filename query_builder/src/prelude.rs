//! Convenience re-exports for common query-builder usage

pub use crate::errors::BuildError;
pub use crate::query_builder::{
    CqlDialect, CreateMode, Dialect, Filter, Operator, QueryBuilder, QueryPlan, SortOrder,
    SqlDialect,
};
pub use type_mapping::{Record, Value};
