//! Unified value model shared by the query builders and the drivers
//! This crate provides the scalar vocabulary callers use for filters, assignments and rows

pub mod normalize;
pub mod sql;
pub mod types;

pub use normalize::normalize_timezone;
pub use sql::{mysql_type_family, TypeFamily};
pub use types::{Record, Value};
