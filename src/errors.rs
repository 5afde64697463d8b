//! Error types for the crudhaus crate
//!
//! Every verb fails with one of the five taxonomy kinds in [`CrudError`];
//! native driver errors are only reachable through [`CrudError::native`].

pub use config::ConfigError;
pub use connection::errors::{CrudError, CrudResult, ErrorKind, NativeError, NativeErrorKind};
pub use query_builder::BuildError;
