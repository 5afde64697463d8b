//! Query builder utilities
//!
//! This module provides the select-request builder consumed by the dialects.

use crate::query_builder::filter::Filter;
use crate::query_builder::ordering::SortOrder;

/// Select request: filters, projection, ordering and limit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryBuilder {
    pub(crate) conditions: Vec<Filter>,
    pub(crate) fields: Vec<String>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) limit: Option<u64>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition
    pub fn filter(mut self, filter: Filter) -> Self {
        self.conditions.push(filter);
        self
    }

    /// Add multiple filters (combined with AND)
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    /// Restrict the projection; no fields means all fields
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add ordering from a spec string (`-field` sorts descending)
    pub fn order_by(mut self, spec: &str) -> Self {
        self.order_by.push(SortOrder::parse_field(spec));
        self
    }

    /// Add ordering for several spec strings, in order
    pub fn order_by_all<S: AsRef<str>>(mut self, specs: impl IntoIterator<Item = S>) -> Self {
        for spec in specs {
            self.order_by.push(SortOrder::parse_field(spec.as_ref()));
        }
        self
    }

    /// Add explicit ordering
    pub fn order_by_field(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    /// Cap the number of rows; unset means unbounded
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn conditions(&self) -> &[Filter] {
        &self.conditions
    }

    pub fn selected_fields(&self) -> &[String] {
        &self.fields
    }

    pub fn ordering(&self) -> &[(String, SortOrder)] {
        &self.order_by
    }

    pub fn row_limit(&self) -> Option<u64> {
        self.limit
    }
}
