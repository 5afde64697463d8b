//! Collection handles
//!
//! A `Collection` binds a session, a collection path and per-call defaults,
//! and forwards the verb set with those arguments filled in.

use std::sync::Arc;
use std::time::Duration;

use connection::CallOptions;
use query_builder::{CreateMode, Filter, QueryBuilder};
use type_mapping::{Record, Value};

use crate::core::Session;
use crate::errors::CrudResult;

#[derive(Debug, Clone)]
pub struct Collection {
    session: Arc<Session>,
    path: String,
    options: CallOptions,
}

impl Collection {
    pub fn new(session: Arc<Session>, path: impl Into<String>) -> Self {
        Self {
            session,
            path: path.into(),
            options: CallOptions::default(),
        }
    }

    /// Default timeout for every call through this handle
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Default retry budget for every call through this handle
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.options = self.options.with_retry(retry);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn create(&self, data: &Record, mode: CreateMode) -> CrudResult<()> {
        self.session
            .create(&self.path, data, mode, &self.options)
            .await
    }

    pub async fn update(&self, data: &Record, filters: &[Filter]) -> CrudResult<()> {
        self.session
            .update(&self.path, data, filters, &self.options)
            .await
    }

    pub async fn delete(&self, filters: &[Filter]) -> CrudResult<()> {
        self.session.delete(&self.path, filters, &self.options).await
    }

    pub async fn filter(&self, query: &QueryBuilder) -> CrudResult<Vec<Record>> {
        self.session.filter(&self.path, query, &self.options).await
    }

    pub async fn get(&self, filters: &[Filter], fields: &[&str]) -> CrudResult<Option<Record>> {
        self.session
            .get(&self.path, filters, fields, &self.options)
            .await
    }

    pub async fn exist(&self, filters: &[Filter]) -> CrudResult<bool> {
        self.session.exist(&self.path, filters, &self.options).await
    }

    /// Raw query; the bound path is not used
    pub async fn execute(&self, query: &str, params: &[Value]) -> CrudResult<Vec<Record>> {
        self.session.execute(query, params, &self.options).await
    }
}
