//! Connection - execution layer for crudhaus
//!
//! This crate owns everything that touches the network: native drivers for
//! the relational and wide-column backends, error classification, the retry
//! loop, connection handles and the unbounded pool that recycles them.

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

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod classifier;
pub mod cql;
pub mod driver;
pub mod errors;
pub mod handle;
pub mod mysql;
pub mod pool;
pub mod retry;

#[cfg(test)]
mod tests;

pub use classifier::{ErrorClass, ErrorTable, StatementKind};
pub use cql::ScyllaDriver;
pub use driver::{Backend, Driver, NativeConnection};
pub use errors::{CrudError, CrudResult, ErrorKind, NativeError, NativeErrorKind};
pub use handle::{CallOptions, ConnectionHandle, ExecutionDefaults, HandleState};
pub use mysql::MySqlDriver;
pub use pool::{ConnectionPool, PooledHandle};
pub use retry::RetryPolicy;
