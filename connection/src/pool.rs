//! Unbounded connection pool
//!
//! The pool never blocks: checkout takes an idle handle or creates a new one.
//! Idle handles are reused in FIFO order.

use crate::driver::Backend;
use crate::errors::CrudResult;
use crate::handle::{CallOptions, ConnectionHandle, ExecutionDefaults};
use config::DatabaseConfig;
use query_builder::{CreateMode, Filter, QueryBuilder};
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::Span;
use type_mapping::{Record, Value};

pub struct ConnectionPool {
    backend: Arc<Backend>,
    defaults: ExecutionDefaults,
    idle: Mutex<VecDeque<ConnectionHandle>>,
    created: AtomicUsize,
    span: Span,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("backend", &self.backend)
            .field("idle", &self.idle_count())
            .field("created", &self.created_count())
            .finish()
    }
}

impl ConnectionPool {
    /// Pool for one database configuration
    pub fn new(config: &DatabaseConfig) -> Self {
        Self::with_backend(Backend::from_config(config), ExecutionDefaults::from_config(config))
    }

    /// Pool over an explicit backend
    pub fn with_backend(backend: Backend, defaults: ExecutionDefaults) -> Self {
        let span = tracing::info_span!("pool", backend = backend.name());
        Self {
            backend: Arc::new(backend),
            defaults,
            idle: Mutex::new(VecDeque::new()),
            created: AtomicUsize::new(0),
            span,
        }
    }

    /// Parent span for every handle this pool creates
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    fn idle(&self) -> MutexGuard<'_, VecDeque<ConnectionHandle>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn defaults(&self) -> &ExecutionDefaults {
        &self.defaults
    }

    /// Take an idle handle, or create a fresh lazily-connecting one
    pub fn checkout(&self) -> ConnectionHandle {
        let reused = self.idle().pop_front();
        match reused {
            Some(handle) => handle,
            None => {
                let id = self.created.fetch_add(1, Ordering::Relaxed) + 1;
                crate::debug_log!(parent: &self.span, id, "creating handle");
                ConnectionHandle::new(id, self.backend.clone(), self.defaults, &self.span)
            }
        }
    }

    /// Return a handle to the idle set, whatever the outcome of its last use
    pub fn checkin(&self, mut handle: ConnectionHandle) {
        if handle.is_in_flight() {
            handle.discard();
        }
        self.idle().push_back(handle);
    }

    /// Check out a handle that checks itself back in when dropped
    pub fn acquire(&self) -> PooledHandle<'_> {
        PooledHandle {
            pool: self,
            handle: Some(self.checkout()),
        }
    }

    /// Close every idle handle. Handles checked out at the time are unaffected
    /// and rejoin the idle set on checkin.
    pub async fn close_all(&self) {
        let drained: Vec<ConnectionHandle> = self.idle().drain(..).collect();
        crate::debug_log!(parent: &self.span, count = drained.len(), "closing idle handles");
        for mut handle in drained {
            handle.close().await;
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    /// Handles created over the pool's lifetime
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub async fn create(
        &self,
        collection: &str,
        data: &Record,
        mode: CreateMode,
        options: &CallOptions,
    ) -> CrudResult<()> {
        let mut handle = self.acquire();
        handle.create(collection, data, mode, options).await
    }

    pub async fn update(
        &self,
        collection: &str,
        data: &Record,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<()> {
        let mut handle = self.acquire();
        handle.update(collection, data, filters, options).await
    }

    pub async fn delete(
        &self,
        collection: &str,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<()> {
        let mut handle = self.acquire();
        handle.delete(collection, filters, options).await
    }

    pub async fn filter(
        &self,
        collection: &str,
        query: &QueryBuilder,
        options: &CallOptions,
    ) -> CrudResult<Vec<Record>> {
        let mut handle = self.acquire();
        handle.filter(collection, query, options).await
    }

    pub async fn get(
        &self,
        collection: &str,
        filters: &[Filter],
        fields: &[&str],
        options: &CallOptions,
    ) -> CrudResult<Option<Record>> {
        let mut handle = self.acquire();
        handle.get(collection, filters, fields, options).await
    }

    pub async fn exist(
        &self,
        collection: &str,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<bool> {
        let mut handle = self.acquire();
        handle.exist(collection, filters, options).await
    }

    pub async fn execute(
        &self,
        query: &str,
        params: &[Value],
        options: &CallOptions,
    ) -> CrudResult<Vec<Record>> {
        let mut handle = self.acquire();
        handle.execute(query, params, options).await
    }
}

const HANDLE_TAKEN: &str = "pooled handle already returned";

/// Checked-out handle, returned to its pool on drop.
///
/// If the owning future is dropped mid-statement, the native connection is
/// discarded before the handle rejoins the idle set.
pub struct PooledHandle<'a> {
    pool: &'a ConnectionPool,
    handle: Option<ConnectionHandle>,
}

impl Deref for PooledHandle<'_> {
    type Target = ConnectionHandle;

    fn deref(&self) -> &Self::Target {
        self.handle.as_ref().expect(HANDLE_TAKEN)
    }
}

impl DerefMut for PooledHandle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handle.as_mut().expect(HANDLE_TAKEN)
    }
}

impl Drop for PooledHandle<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.checkin(handle);
        }
    }
}
