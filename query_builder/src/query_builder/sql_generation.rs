//! Query builder utilities
//!
//! This module provides relational (MySQL-family) query generation, and the
//! clause writer shared with the wide-column dialect.

use crate::errors::BuildError;
use crate::query_builder::builder::QueryBuilder;
use crate::query_builder::filter::{Filter, Operator};
use crate::query_builder::identifier::{quote_name, quote_path};
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::plan::{CreateMode, Dialect, QueryPlan};
use type_mapping::{normalize_timezone, Record, Value};

/// Positional placeholder used by both dialects
pub const PLACEHOLDER: &str = "?";

/// Renders clause fragments and collects their parameters in order
pub(crate) struct ClauseWriter {
    quote: char,
    split_paths: bool,
    pub(crate) params: Vec<Value>,
}

impl ClauseWriter {
    pub(crate) fn new(quote: char, split_paths: bool) -> Self {
        Self {
            quote,
            split_paths,
            params: Vec::new(),
        }
    }

    pub(crate) fn field(&self, name: &str) -> Result<String, BuildError> {
        if self.split_paths {
            quote_path(name, self.quote)
        } else {
            quote_name(name, self.quote)
        }
    }

    pub(crate) fn bind(&mut self, value: &Value) -> &'static str {
        self.params.push(normalize_timezone(value));
        PLACEHOLDER
    }

    /// Build WHERE clause from filters; empty input yields an empty clause
    pub(crate) fn where_clause(&mut self, filters: &[Filter]) -> Result<String, BuildError> {
        if filters.is_empty() {
            return Ok(String::new());
        }

        let conditions = filters
            .iter()
            .map(|filter| self.condition(filter))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(format!("WHERE {}", conditions.join(" AND ")))
    }

    fn condition(&mut self, filter: &Filter) -> Result<String, BuildError> {
        let field = self.field(&filter.field)?;

        match filter.operator {
            Operator::In => {
                let values = match filter.value.as_list() {
                    Some(values) if !values.is_empty() => values,
                    _ => {
                        return Err(BuildError::InvalidInOperand {
                            field: filter.field.clone(),
                        })
                    }
                };
                let placeholders: Vec<&str> = values.iter().map(|v| self.bind(v)).collect();
                Ok(format!("{} IN ({})", field, placeholders.join(", ")))
            }
            Operator::Eq | Operator::Ne if filter.value.is_null() => {
                // IS NULL / IS NOT NULL take no parameter
                Ok(format!("{} {} NULL", field, filter.rendered_operator()))
            }
            operator => {
                let placeholder = self.bind(&filter.value);
                Ok(format!("{} {} {}", field, operator.as_str(), placeholder))
            }
        }
    }

    /// Build the projection list; no fields selects all
    pub(crate) fn select_list(&self, fields: &[String]) -> Result<String, BuildError> {
        if fields.is_empty() {
            return Ok("*".to_string());
        }
        let quoted = fields
            .iter()
            .map(|f| self.field(f))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(quoted.join(", "))
    }

    /// Build ORDER BY clause
    pub(crate) fn order_clause(&self, order_by: &[(String, SortOrder)]) -> Result<String, BuildError> {
        if order_by.is_empty() {
            return Ok(String::new());
        }

        let order_items = order_by
            .iter()
            .map(|(field, order)| Ok(format!("{} {}", self.field(field)?, order.to_sql())))
            .collect::<Result<Vec<_>, BuildError>>()?;

        Ok(format!("ORDER BY {}", order_items.join(", ")))
    }

    /// Build LIMIT clause; unbounded (absent or zero) omits it entirely
    pub(crate) fn limit_clause(limit: Option<u64>) -> String {
        match limit {
            Some(limit) if limit > 0 => format!("LIMIT {}", limit),
            _ => String::new(),
        }
    }

    /// Quoted column list and matching placeholder list for an insert
    pub(crate) fn insert_columns(
        &mut self,
        data: &Record,
        statement: &'static str,
    ) -> Result<(String, String), BuildError> {
        if data.is_empty() {
            return Err(BuildError::EmptyAssignments { statement });
        }
        let mut columns = Vec::with_capacity(data.len());
        let mut placeholders = Vec::with_capacity(data.len());
        for (field, value) in data {
            columns.push(self.field(field)?);
            placeholders.push(self.bind(value));
        }
        Ok((columns.join(", "), placeholders.join(", ")))
    }

    /// `field = ?` assignments for an update
    pub(crate) fn set_clause(
        &mut self,
        data: &Record,
        statement: &'static str,
    ) -> Result<String, BuildError> {
        if data.is_empty() {
            return Err(BuildError::EmptyAssignments { statement });
        }
        let assignments = data
            .iter()
            .map(|(field, value)| {
                let field = self.field(field)?;
                Ok(format!("{} = {}", field, self.bind(value)))
            })
            .collect::<Result<Vec<_>, BuildError>>()?;
        Ok(assignments.join(", "))
    }

    pub(crate) fn finish(self, parts: &[&str]) -> QueryPlan {
        let query = parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        QueryPlan::new(query, self.params)
    }
}

/// Relational dialect: backtick-quoted dotted paths, `?` placeholders.
///
/// Uniqueness violations surface only at execution time, via the backend's
/// duplicate-entry error code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlDialect;

impl SqlDialect {
    const QUOTE: char = '`';

    fn writer() -> ClauseWriter {
        ClauseWriter::new(Self::QUOTE, true)
    }

    fn mode_keyword(mode: CreateMode) -> &'static str {
        match mode {
            CreateMode::Insert => "INSERT",
            CreateMode::Ignore => "INSERT IGNORE",
            CreateMode::Replace => "REPLACE",
        }
    }
}

impl Dialect for SqlDialect {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn create(&self, collection: &str, data: &Record, mode: CreateMode) -> Result<QueryPlan, BuildError> {
        let mut writer = Self::writer();
        let table = writer.field(collection)?;
        let (columns, values) = writer.insert_columns(data, "create")?;
        let statement = format!(
            "{} INTO {} ({}) VALUES ({})",
            Self::mode_keyword(mode),
            table,
            columns,
            values
        );
        Ok(writer.finish(&[&statement]))
    }

    fn update(&self, collection: &str, filters: &[Filter], data: &Record) -> Result<QueryPlan, BuildError> {
        let mut writer = Self::writer();
        let table = writer.field(collection)?;
        let set_clause = writer.set_clause(data, "update")?;
        let where_clause = writer.where_clause(filters)?;
        let head = format!("UPDATE {} SET {}", table, set_clause);
        Ok(writer.finish(&[&head, &where_clause]))
    }

    fn delete(&self, collection: &str, filters: &[Filter]) -> Result<QueryPlan, BuildError> {
        let mut writer = Self::writer();
        let table = writer.field(collection)?;
        let where_clause = writer.where_clause(filters)?;
        let head = format!("DELETE FROM {}", table);
        Ok(writer.finish(&[&head, &where_clause]))
    }

    fn filter(&self, collection: &str, query: &QueryBuilder) -> Result<QueryPlan, BuildError> {
        let mut writer = Self::writer();
        let table = writer.field(collection)?;
        let select_list = writer.select_list(query.selected_fields())?;
        let where_clause = writer.where_clause(query.conditions())?;
        let order_clause = writer.order_clause(query.ordering())?;
        let limit_clause = ClauseWriter::limit_clause(query.row_limit());
        let head = format!("SELECT {} FROM {}", select_list, table);
        Ok(writer.finish(&[&head, &where_clause, &order_clause, &limit_clause]))
    }
}
