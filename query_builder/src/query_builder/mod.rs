//! Query builder utilities
//!
//! This module provides dialect-specific query construction utilities.

pub mod builder;
pub mod cql_generation;
pub mod filter;
pub mod identifier;
pub mod ordering;
pub mod plan;
pub mod sql_generation;

#[cfg(test)]
mod tests;

pub use builder::QueryBuilder;
pub use cql_generation::CqlDialect;
pub use filter::{Filter, Operator};
pub use identifier::CollectionRef;
pub use ordering::SortOrder;
pub use plan::{CreateMode, Dialect, QueryPlan};
pub use sql_generation::SqlDialect;
