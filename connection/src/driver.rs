//! Driver seam
//!
//! A `Driver` opens native connections; a `NativeConnection` runs one query at
//! a time. The pool and handles only ever see these traits.

use crate::classifier::ErrorTable;
use crate::errors::NativeError;
use crate::cql::ScyllaDriver;
use crate::mysql::MySqlDriver;
use async_trait::async_trait;
use config::DatabaseConfig;
use query_builder::{CqlDialect, Dialect, SqlDialect};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use type_mapping::{Record, Value};

#[async_trait]
pub trait Driver: Send + Sync {
    /// Open one native connection
    async fn connect(&self) -> Result<Box<dyn NativeConnection>, NativeError>;
}

#[async_trait]
pub trait NativeConnection: Send {
    /// Run `query` with positional `params`, returning rows as records.
    ///
    /// `timeout` is advisory for drivers that support a server-side request
    /// deadline; the handle enforces it regardless.
    async fn query(
        &mut self,
        query: &str,
        params: &[Value],
        timeout: Duration,
    ) -> Result<Vec<Record>, NativeError>;

    /// Release the native resources
    async fn close(self: Box<Self>) -> Result<(), NativeError>;
}

/// Everything a handle needs to talk to one backend
pub struct Backend {
    name: &'static str,
    driver: Arc<dyn Driver>,
    dialect: Box<dyn Dialect>,
    errors: ErrorTable,
    close_on_operation_failure: bool,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .field("dialect", &self.dialect.name())
            .field("close_on_operation_failure", &self.close_on_operation_failure)
            .finish()
    }
}

impl Backend {
    pub fn new(
        name: &'static str,
        driver: Arc<dyn Driver>,
        dialect: Box<dyn Dialect>,
        errors: ErrorTable,
    ) -> Self {
        Self {
            name,
            driver,
            dialect,
            errors,
            close_on_operation_failure: false,
        }
    }

    /// Drop the native connection whenever a transient failure is seen
    pub fn close_on_operation_failure(mut self, enabled: bool) -> Self {
        self.close_on_operation_failure = enabled;
        self
    }

    /// Select driver, dialect and error table from a configuration
    pub fn from_config(config: &DatabaseConfig) -> Self {
        match config {
            DatabaseConfig::Mysql(conf) => {
                let errors = if conf.tidb_patch {
                    ErrorTable::tidb()
                } else {
                    ErrorTable::mysql()
                };
                Self::new(
                    config.backend_name(),
                    Arc::new(MySqlDriver::new(conf.clone())),
                    Box::new(SqlDialect),
                    errors,
                )
                .close_on_operation_failure(true)
            }
            DatabaseConfig::Cassandra(conf) => Self::new(
                config.backend_name(),
                Arc::new(ScyllaDriver::new(conf.clone())),
                Box::new(CqlDialect),
                ErrorTable::cql(),
            ),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn errors(&self) -> &ErrorTable {
        &self.errors
    }

    pub fn closes_on_operation_failure(&self) -> bool {
        self.close_on_operation_failure
    }
}
