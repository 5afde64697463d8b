//! Core crudhaus functionality
//!
//! This module contains the Session routing façade: a registry of connection
//! pools keyed by configuration, a default pool, and the verb set dispatched
//! to it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use config::{AppConfig, DatabaseConfig};
use connection::{CallOptions, ConnectionPool};
use query_builder::{CreateMode, Filter, QueryBuilder};
use type_mapping::{Record, Value};

use crate::collection::Collection;
use crate::errors::{CrudError, CrudResult};

/// Message raised when a verb is dispatched without any registered backend
pub const NO_DATABASE_CONF: &str = "no database conf";

/// Routes CRUD verbs to pooled backends
#[derive(Debug, Default)]
pub struct Session {
    pools: Mutex<HashMap<String, Arc<ConnectionPool>>>,
    default: Mutex<Option<Arc<ConnectionPool>>>,
}

impl Session {
    /// Create an empty session; register backends with [`Session::using`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with every configuration registered up front.
    /// The first one becomes the default.
    pub fn with_databases(
        configs: impl IntoIterator<Item = DatabaseConfig>,
    ) -> CrudResult<Self> {
        let session = Self::new();
        for config in configs {
            session.using(&config)?;
        }
        Ok(session)
    }

    /// Create a session from loaded application configuration
    pub fn from_app_config(config: &AppConfig) -> CrudResult<Self> {
        config.validate()?;
        Self::with_databases(config.databases.iter().cloned())
    }

    fn pools(&self) -> MutexGuard<'_, HashMap<String, Arc<ConnectionPool>>> {
        self.pools.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn default_slot(&self) -> MutexGuard<'_, Option<Arc<ConnectionPool>>> {
        self.default.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pool for `config`, created and cached on first use.
    ///
    /// Configurations that serialize identically share one pool. The first
    /// pool ever registered becomes the default.
    pub fn using(&self, config: &DatabaseConfig) -> CrudResult<Arc<ConnectionPool>> {
        config.validate()?;
        let key = config.canonical_key();

        let mut pools = self.pools();
        if let Some(pool) = pools.get(&key) {
            crate::debug_log!(backend = config.backend_name(), "reusing cached pool");
            return Ok(pool.clone());
        }

        let pool = Arc::new(ConnectionPool::new(config));
        self.register(&mut pools, key, pool.clone());
        Ok(pool)
    }

    /// Register a prebuilt pool under `key`, replacing any pool already
    /// cached there. Follows the same default rule as [`Session::using`].
    pub fn attach(&self, key: impl Into<String>, pool: ConnectionPool) -> Arc<ConnectionPool> {
        let pool = Arc::new(pool);
        let mut pools = self.pools();
        self.register(&mut pools, key.into(), pool.clone());
        pool
    }

    fn register(
        &self,
        pools: &mut HashMap<String, Arc<ConnectionPool>>,
        key: String,
        pool: Arc<ConnectionPool>,
    ) {
        tracing::info!(backend = pool.backend().name(), "registered database");
        pools.insert(key, pool.clone());

        let mut default = self.default_slot();
        if default.is_none() {
            *default = Some(pool);
        }
    }

    /// Make `config` the default backend, registering it if needed
    pub fn set_default(&self, config: &DatabaseConfig) -> CrudResult<Arc<ConnectionPool>> {
        let pool = self.using(config)?;
        *self.default_slot() = Some(pool.clone());
        Ok(pool)
    }

    /// Pool that verbs without an explicit backend are routed to
    pub fn default_pool(&self) -> CrudResult<Arc<ConnectionPool>> {
        self.default_slot()
            .clone()
            .ok_or_else(|| CrudError::programming(NO_DATABASE_CONF))
    }

    /// Number of distinct backends registered
    pub fn pool_count(&self) -> usize {
        self.pools().len()
    }

    /// Bind a collection path and per-call defaults into a handle
    pub fn collection(self: &Arc<Self>, path: impl Into<String>) -> Collection {
        Collection::new(self.clone(), path)
    }

    pub async fn create(
        &self,
        collection: &str,
        data: &Record,
        mode: CreateMode,
        options: &CallOptions,
    ) -> CrudResult<()> {
        self.default_pool()?
            .create(collection, data, mode, options)
            .await
    }

    pub async fn update(
        &self,
        collection: &str,
        data: &Record,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<()> {
        self.default_pool()?
            .update(collection, data, filters, options)
            .await
    }

    pub async fn delete(
        &self,
        collection: &str,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<()> {
        self.default_pool()?.delete(collection, filters, options).await
    }

    pub async fn filter(
        &self,
        collection: &str,
        query: &QueryBuilder,
        options: &CallOptions,
    ) -> CrudResult<Vec<Record>> {
        self.default_pool()?.filter(collection, query, options).await
    }

    pub async fn get(
        &self,
        collection: &str,
        filters: &[Filter],
        fields: &[&str],
        options: &CallOptions,
    ) -> CrudResult<Option<Record>> {
        self.default_pool()?
            .get(collection, filters, fields, options)
            .await
    }

    pub async fn exist(
        &self,
        collection: &str,
        filters: &[Filter],
        options: &CallOptions,
    ) -> CrudResult<bool> {
        self.default_pool()?.exist(collection, filters, options).await
    }

    pub async fn execute(
        &self,
        query: &str,
        params: &[Value],
        options: &CallOptions,
    ) -> CrudResult<Vec<Record>> {
        self.default_pool()?.execute(query, params, options).await
    }

    /// Close every cached pool and forget all registrations
    pub async fn close(&self) {
        let pools: Vec<Arc<ConnectionPool>> = {
            let mut registry = self.pools();
            let mut default = self.default_slot();
            *default = None;
            registry.drain().map(|(_, pool)| pool).collect()
        };

        for pool in pools {
            pool.close_all().await;
        }
        tracing::info!("session closed");
    }
}
