use thiserror::Error;

/// Errors raised while translating a request into a query plan
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Not support filter operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("IN filter on {field} requires a non-empty list of values")]
    InvalidInOperand { field: String },

    #[error("{statement} requires at least one assignment")]
    EmptyAssignments { statement: &'static str },

    #[error("Invalid create mode: {0}")]
    InvalidCreateMode(String),
}
