//! Query Builder - Dialect query translation for crudhaus
//!
//! This crate turns the generic CRUD vocabulary (collection, filters,
//! assignments, projection, ordering, limit) into backend-native query text
//! and positional parameters. Builders are pure: they never touch the network.

pub mod errors;
pub mod prelude;
pub mod query_builder;

pub use errors::BuildError;
pub use query_builder::{
    CollectionRef, CqlDialect, CreateMode, Dialect, Filter, Operator, QueryBuilder, QueryPlan,
    SortOrder, SqlDialect,
};
pub use type_mapping::{Record, Value};
