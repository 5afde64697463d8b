//! Wide-column (CQL) query generation
//!
//! Collections are `keyspace.table` or a bare table, left unquoted when they
//! are plain identifiers. Field names are quoted whole, since CQL has no
//! nested column paths.

use crate::errors::BuildError;
use crate::query_builder::builder::QueryBuilder;
use crate::query_builder::filter::Filter;
use crate::query_builder::identifier::CollectionRef;
use crate::query_builder::plan::{CreateMode, Dialect, QueryPlan};
use crate::query_builder::sql_generation::ClauseWriter;
use type_mapping::Record;

/// Wide-column dialect: double-quoted identifiers, lightweight transactions
/// for conditional writes, `ALLOW FILTERING` on every select.
#[derive(Debug, Clone, Copy, Default)]
pub struct CqlDialect;

impl CqlDialect {
    const QUOTE: char = '"';

    fn writer() -> ClauseWriter {
        ClauseWriter::new(Self::QUOTE, false)
    }

    fn table(collection: &str) -> Result<String, BuildError> {
        CollectionRef::parse(collection)?.rendered(Self::QUOTE)
    }

    /// Conditional suffix for an insert in `mode`
    fn create_condition(mode: CreateMode) -> &'static str {
        match mode {
            CreateMode::Replace => "",
            CreateMode::Insert | CreateMode::Ignore => "IF NOT EXISTS",
        }
    }
}

impl Dialect for CqlDialect {
    fn name(&self) -> &'static str {
        "cql"
    }

    fn create(&self, collection: &str, data: &Record, mode: CreateMode) -> Result<QueryPlan, BuildError> {
        let mut writer = Self::writer();
        let table = Self::table(collection)?;
        let (columns, values) = writer.insert_columns(data, "create")?;
        let head = format!("INSERT INTO {} ({}) VALUES ({})", table, columns, values);
        Ok(writer.finish(&[&head, Self::create_condition(mode)]))
    }

    fn update(&self, collection: &str, filters: &[Filter], data: &Record) -> Result<QueryPlan, BuildError> {
        let mut writer = Self::writer();
        let table = Self::table(collection)?;
        let set_clause = writer.set_clause(data, "update")?;
        let where_clause = writer.where_clause(filters)?;
        let head = format!("UPDATE {} SET {}", table, set_clause);
        Ok(writer.finish(&[&head, &where_clause, "IF EXISTS"]))
    }

    fn delete(&self, collection: &str, filters: &[Filter]) -> Result<QueryPlan, BuildError> {
        let mut writer = Self::writer();
        let table = Self::table(collection)?;
        let where_clause = writer.where_clause(filters)?;
        let head = format!("DELETE FROM {}", table);
        Ok(writer.finish(&[&head, &where_clause]))
    }

    fn filter(&self, collection: &str, query: &QueryBuilder) -> Result<QueryPlan, BuildError> {
        let mut writer = Self::writer();
        let table = Self::table(collection)?;
        let select_list = writer.select_list(query.selected_fields())?;
        let where_clause = writer.where_clause(query.conditions())?;
        let order_clause = writer.order_clause(query.ordering())?;
        let limit_clause = ClauseWriter::limit_clause(query.row_limit());
        let head = format!("SELECT {} FROM {}", select_list, table);
        Ok(writer.finish(&[
            &head,
            &where_clause,
            &order_clause,
            &limit_clause,
            "ALLOW FILTERING",
        ]))
    }
}
