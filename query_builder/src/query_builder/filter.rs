//! Filter triples
//!
//! A filter is an `(operator, field, value)` predicate; sibling filters are AND-ed.

use crate::errors::BuildError;
use std::fmt;
use std::str::FromStr;
use type_mapping::Value;

/// Query condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Lt,  // <
    Gt,  // >
    Gte, // >=
    Lte, // <=
    Eq,  // =
    Ne,  // !=
    In,  // IN
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::In => "IN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = BuildError;

    /// Case-insensitive; `in` and `IN` are the same operator
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "<=" => Ok(Operator::Lte),
            "=" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "IN" => Ok(Operator::In),
            _ => Err(BuildError::UnsupportedOperator(s.to_string())),
        }
    }
}

/// Single condition in a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub operator: Operator,
    pub field: String,
    pub value: Value,
}

impl Filter {
    /// Parse a filter triple; unknown operators are rejected here
    pub fn new(operator: &str, field: &str, value: impl Into<Value>) -> Result<Self, BuildError> {
        Ok(Self::with_operator(operator.parse()?, field, value))
    }

    pub fn with_operator(operator: Operator, field: &str, value: impl Into<Value>) -> Self {
        Self {
            operator,
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::with_operator(Operator::Eq, field, value)
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::with_operator(Operator::Ne, field, value)
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::with_operator(Operator::Lt, field, value)
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self::with_operator(Operator::Lte, field, value)
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::with_operator(Operator::Gt, field, value)
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self::with_operator(Operator::Gte, field, value)
    }

    /// IN condition over an ordered sequence of scalars
    pub fn is_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::with_operator(
            Operator::In,
            field,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// `field IS NULL`
    pub fn is_null(field: &str) -> Self {
        Self::eq(field, Value::Null)
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(field: &str) -> Self {
        Self::ne(field, Value::Null)
    }

    /// Operator as rendered, accounting for null comparisons
    pub fn rendered_operator(&self) -> &'static str {
        match (self.operator, self.value.is_null()) {
            (Operator::Eq, true) => "IS",
            (Operator::Ne, true) => "IS NOT",
            (op, _) => op.as_str(),
        }
    }
}

impl<'a> TryFrom<(&'a str, &'a str, Value)> for Filter {
    type Error = BuildError;

    fn try_from((operator, field, value): (&'a str, &'a str, Value)) -> Result<Self, Self::Error> {
        Filter::new(operator, field, value)
    }
}
