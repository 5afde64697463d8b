//! Query plans and the dialect contract

use crate::errors::BuildError;
use crate::query_builder::builder::QueryBuilder;
use crate::query_builder::filter::Filter;
use std::fmt;
use std::str::FromStr;
use type_mapping::{Record, Value};

/// Builder output: query text plus positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub query: String,
    pub params: Vec<Value>,
}

impl QueryPlan {
    pub fn new(query: String, params: Vec<Value>) -> Self {
        Self { query, params }
    }
}

/// How `create` treats an existing row with the same unique key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CreateMode {
    /// Fail with a duplicate-key error
    #[default]
    Insert,
    /// Leave the existing row untouched
    Ignore,
    /// Overwrite unconditionally
    Replace,
}

impl CreateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateMode::Insert => "INSERT",
            CreateMode::Ignore => "IGNORE",
            CreateMode::Replace => "REPLACE",
        }
    }
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreateMode {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(CreateMode::Insert),
            "IGNORE" => Ok(CreateMode::Ignore),
            "REPLACE" => Ok(CreateMode::Replace),
            _ => Err(BuildError::InvalidCreateMode(s.to_string())),
        }
    }
}

/// A backend query language.
///
/// Implementations are stateless: identical input yields byte-identical plans,
/// which lets the executor replay a plan on retry.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Insert-family statement for `mode`
    fn create(&self, collection: &str, data: &Record, mode: CreateMode)
        -> Result<QueryPlan, BuildError>;

    fn update(&self, collection: &str, filters: &[Filter], data: &Record)
        -> Result<QueryPlan, BuildError>;

    fn delete(&self, collection: &str, filters: &[Filter]) -> Result<QueryPlan, BuildError>;

    /// Select-family statement
    fn filter(&self, collection: &str, query: &QueryBuilder) -> Result<QueryPlan, BuildError>;
}
