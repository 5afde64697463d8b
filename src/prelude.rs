//! Convenience re-exports for common crudhaus usage
//!
//! # Example
//!
//! ```rust
//! use crudhaus::prelude::*;
//!
//! let filter = Filter::eq("id", 1);
//! assert_eq!(filter.operator, Operator::Eq);
//! ```

// Core components
pub use crate::collection::Collection;
pub use crate::core::Session;
pub use crate::errors::{CrudError, CrudResult, ErrorKind};

// Configuration
pub use config::{AppConfig, CqlConfig, DatabaseConfig, SqlConfig};

// Request vocabulary
pub use query_builder::{CreateMode, Filter, Operator, QueryBuilder, SortOrder};
pub use type_mapping::{Record, Value};

// Execution
pub use connection::{CallOptions, ConnectionPool};

// Common external dependencies
pub use async_trait;
pub use tokio;
