//! # crudhaus
//!
//! A backend-agnostic CRUD client. Callers describe reads and writes with a
//! small vocabulary (collection, filters, projection, ordering, limit,
//! assignments); crudhaus translates it into MySQL or CQL, runs it on a pooled
//! connection, retries transient failures, and reports errors through a closed
//! taxonomy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crudhaus::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mysql = DatabaseConfig::Mysql(
//!         SqlConfig::new("127.0.0.1".into(), 3306, "root".into(), "secret".into())
//!             .with_database("app")
//!             .with_max_op_fail_retry(3),
//!     );
//!     let session = Arc::new(Session::with_databases([mysql])?);
//!
//!     let mut user = Record::new();
//!     user.insert("id".into(), Value::from(1));
//!     user.insert("name".into(), Value::from("Ada"));
//!     session
//!         .create("users", &user, CreateMode::Insert, &CallOptions::new())
//!         .await?;
//!
//!     let users = session.collection("users").with_retry(1);
//!     let found = users.get(&[Filter::eq("id", 1)], &["name"]).await?;
//!     println!("found: {:?}", found);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod collection;
pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use collection::Collection;
pub use crate::core::Session;
pub use errors::{CrudError, CrudResult, ErrorKind};

// Re-export centralized config
pub use config::{AppConfig, CqlConfig, DatabaseConfig, SqlConfig};

// Re-export internal crates used in the public API
pub use config;
pub use connection;
pub use query_builder;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
