//! Connection handles
//!
//! A handle wraps at most one native connection, opens it lazily, and runs
//! every statement through the retry loop. Handles are owned by exactly one
//! caller at a time; the pool hands them out and takes them back.

use crate::classifier::StatementKind;
use crate::driver::{Backend, NativeConnection};
use crate::errors::{CrudError, CrudResult, ErrorKind, NativeError};
use crate::retry::RetryPolicy;
use config::DatabaseConfig;
use query_builder::{CreateMode, Filter, QueryBuilder, QueryPlan};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{warn, Span};
use type_mapping::{normalize_timezone, Record, Value};

/// Result column carrying the outcome of a conditional write
const APPLIED_COLUMNS: [&str; 2] = ["[applied]", "applied"];

/// Lifecycle of the native connection behind a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Disconnected,
    Connecting,
    Connected,
}

/// Per-call overrides of the configured retry budget and timeout
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub retry: Option<u32>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Execution settings a handle falls back to when a call does not override them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionDefaults {
    pub timeout: Duration,
    pub max_op_fail_retry: u32,
    pub retry_policy: RetryPolicy,
}

impl ExecutionDefaults {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_op_fail_retry: config.max_op_fail_retry(),
            retry_policy: RetryPolicy::new(config.retry_backoff()),
        }
    }
}

impl Default for ExecutionDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs_f64(config::DEFAULT_TIMEOUT_SECONDS),
            max_op_fail_retry: 0,
            retry_policy: RetryPolicy::default(),
        }
    }
}

pub struct ConnectionHandle {
    id: usize,
    backend: Arc<Backend>,
    native: Option<Box<dyn NativeConnection>>,
    state: HandleState,
    in_flight: bool,
    defaults: ExecutionDefaults,
    span: Span,
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl ConnectionHandle {
    /// Create a disconnected handle; the native connection opens on first use
    pub fn new(id: usize, backend: Arc<Backend>, defaults: ExecutionDefaults, parent: &Span) -> Self {
        let span = tracing::info_span!(parent: parent, "connection", id);
        Self {
            id,
            backend,
            native: None,
            state: HandleState::Disconnected,
            in_flight: false,
            defaults,
            span,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Whether a statement was interrupted before it completed
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    async fn ensure_connected(&mut self) -> CrudResult<()> {
        if self.native.is_some() {
            return Ok(());
        }

        self.state = HandleState::Connecting;
        match self.backend.driver().connect().await {
            Ok(native) => {
                self.native = Some(native);
                self.state = HandleState::Connected;
                crate::debug_log!(parent: &self.span, "connected");
                Ok(())
            }
            Err(source) => {
                self.state = HandleState::Disconnected;
                Err(CrudError::Connect { source })
            }
        }
    }

    /// One attempt: connect if needed, run under the deadline, classify failures
    async fn attempt(
        &mut self,
        query: &str,
        params: &[Value],
        statement: StatementKind,
        timeout: Duration,
    ) -> CrudResult<Vec<Record>> {
        self.ensure_connected().await?;

        let native = self
            .native
            .as_mut()
            .ok_or_else(|| CrudError::Connect {
                source: NativeError::new(
                    crate::errors::NativeErrorKind::Disconnected,
                    "connection is not open",
                ),
            })?;

        self.in_flight = true;
        let outcome = tokio::time::timeout(timeout, native.query(query, params, timeout)).await;
        self.in_flight = false;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(NativeError::timeout(timeout)),
        };
        result.map_err(|err| self.backend.errors().classify(err, statement))
    }

    /// Run a statement with the retry budget.
    ///
    /// Transient failures are retried up to `retry` times; the relational
    /// backend drops its connection before each retry and before giving up.
    /// Unexpected failures always drop the connection.
    async fn run(
        &mut self,
        query: &str,
        params: &[Value],
        statement: StatementKind,
        options: &CallOptions,
    ) -> CrudResult<Vec<Record>> {
        let retry = options.retry.unwrap_or(self.defaults.max_op_fail_retry);
        let timeout = options.timeout.unwrap_or(self.defaults.timeout);
        crate::trace_log!(parent: &self.span, query, params = params.len(), "executing");

        let mut attempt = 0;
        loop {
            let err = match self.attempt(query, params, statement, timeout).await {
                Ok(rows) => return Ok(rows),
                Err(err) => err,
            };

            match err.kind() {
                ErrorKind::OperationFailure => {
                    if self.backend.closes_on_operation_failure() {
                        self.close().await;
                    }
                    if attempt >= retry {
                        return Err(err);
                    }
                    warn!(parent: &self.span, "RETRY: {}", err);
                    self.defaults.retry_policy.wait(attempt).await;
                    attempt += 1;
                }
                ErrorKind::Unexpected => {
                    self.close().await;
                    return Err(err);
                }
                ErrorKind::Connect | ErrorKind::Programming | ErrorKind::DuplicateKey => {
                    return Err(err);
                }
            }
        }
    }

    async fn run_plan(
        &mut self,
        plan: &QueryPlan,
        statement: StatementKind,
        options: &CallOptions,
    ) -> CrudResult<Vec<Record>> {
        self.run(&plan.query, &plan.params, statement, options).await
    }

    /// Insert one record.
    ///
    /// In `Insert` mode a conditional write that was not applied is reported
    /// as a duplicate key.
    pub async fn create(
        &mut self,
        collection: &str,
        data: &Record,
        mode: CreateMode,
        options: &CallOptions,
    ) -> CrudResult<()> {
        let plan = self.backend.dialect().create(collection, data, mode)?;
        let rows = self.run_plan(&plan, StatementKind::Create, options).await?;

        if mode == CreateMode::Insert && rows.first().and_then(applied) == Some(false) {
            return Err(CrudError::duplicate_key(format!(
                "record already exists in {}",
                collection
            )));
        }
        Ok(())
    }

    pub async fn update(
        &mut self,
        collection: &str,
        data: &Record,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<()> {
        let plan = self.backend.dialect().update(collection, filters, data)?;
        self.run_plan(&plan, StatementKind::Update, options).await?;
        Ok(())
    }

    pub async fn delete(
        &mut self,
        collection: &str,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<()> {
        let plan = self.backend.dialect().delete(collection, filters)?;
        self.run_plan(&plan, StatementKind::Delete, options).await?;
        Ok(())
    }

    pub async fn filter(
        &mut self,
        collection: &str,
        query: &QueryBuilder,
        options: &CallOptions,
    ) -> CrudResult<Vec<Record>> {
        let plan = self.backend.dialect().filter(collection, query)?;
        self.run_plan(&plan, StatementKind::Select, options).await
    }

    /// First matching row, if any
    pub async fn get(
        &mut self,
        collection: &str,
        filters: &[Filter],
        fields: &[&str],
        options: &CallOptions,
    ) -> CrudResult<Option<Record>> {
        let query = QueryBuilder::new()
            .filters(filters.iter().cloned())
            .fields(fields.iter().copied())
            .limit(1);
        let rows = self.filter(collection, &query, options).await?;
        Ok(rows.into_iter().next())
    }

    /// Whether any row matches; at least one filter is required
    pub async fn exist(
        &mut self,
        collection: &str,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<bool> {
        let first = filters
            .first()
            .ok_or_else(|| CrudError::programming("exist without filter is not supported"))?;
        let field = first.field.clone();
        let row = self.get(collection, filters, &[field.as_str()], options).await?;
        Ok(row.is_some())
    }

    /// Run raw query text, bypassing the builders
    pub async fn execute(
        &mut self,
        query: &str,
        params: &[Value],
        options: &CallOptions,
    ) -> CrudResult<Vec<Record>> {
        let params: Vec<Value> = params.iter().map(normalize_timezone).collect();
        self.run(query, &params, StatementKind::Raw, options).await
    }

    /// Close the native connection; the handle stays usable and reconnects lazily
    pub async fn close(&mut self) {
        if let Some(native) = self.native.take() {
            if let Err(err) = native.close().await {
                warn!(parent: &self.span, "failed to close connection: {}", err);
            }
            crate::debug_log!(parent: &self.span, "closed");
        }
        self.state = HandleState::Disconnected;
        self.in_flight = false;
    }

    /// Drop the native connection without a graceful close
    pub fn discard(&mut self) {
        if self.native.take().is_some() {
            warn!(parent: &self.span, "discarding connection interrupted mid-statement");
        }
        self.state = HandleState::Disconnected;
        self.in_flight = false;
    }
}

fn applied(row: &Record) -> Option<bool> {
    APPLIED_COLUMNS
        .iter()
        .find_map(|column| row.get(*column))
        .and_then(Value::as_bool)
}
