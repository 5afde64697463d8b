//! Error classification
//!
//! Each backend owns a table from native error shape to taxonomy class.
//! Anything the table does not know is unexpected.

use crate::errors::{CrudError, NativeError, NativeErrorKind};
use std::collections::{HashMap, HashSet};

/// MySQL error codes that indicate a malformed or disallowed statement
const MYSQL_PROGRAMMING_CODES: std::ops::RangeInclusive<i32> = 1046..=1075;
/// Data truncated
const MYSQL_DATA_TRUNCATED: i32 = 1265;
/// Statements the server refuses outright, such as bad syntax or a missing table
const MYSQL_REJECTED_STATEMENT_CODES: [i32; 12] = [
    1007, 1064, 1102, 1103, 1110, 1111, 1112, 1113, 1146, 1149, 1166, 1179,
];
/// Duplicate entry for a unique key
const MYSQL_DUPLICATE_ENTRY: i32 = 1062;
/// Interface error, too many connections, server gone away, lost connection
const MYSQL_TRANSIENT_CODES: [i32; 4] = [0, 1040, 2006, 2013];
/// TiDB "try again later"
const TIDB_TRY_AGAIN_LATER: i32 = 1105;

/// CQL protocol error codes
mod cql_codes {
    pub const UNAVAILABLE: i32 = 0x1000;
    pub const OVERLOADED: i32 = 0x1001;
    pub const IS_BOOTSTRAPPING: i32 = 0x1002;
    pub const WRITE_TIMEOUT: i32 = 0x1100;
    pub const READ_TIMEOUT: i32 = 0x1200;
    pub const SYNTAX_ERROR: i32 = 0x2000;
    pub const UNAUTHORIZED: i32 = 0x2100;
    pub const INVALID: i32 = 0x2200;
    pub const CONFIG_ERROR: i32 = 0x2300;
}

/// Taxonomy class a native error maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Programming,
    OperationFailure,
    Unexpected,
}

/// Statement family being executed; only inserts can yield duplicate-key errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Create,
    Update,
    Delete,
    Select,
    Raw,
}

/// Native error shape to class lookup for one backend
#[derive(Debug, Clone, Default)]
pub struct ErrorTable {
    entries: HashMap<NativeErrorKind, ErrorClass>,
    duplicate_key: HashSet<NativeErrorKind>,
}

impl ErrorTable {
    /// Empty table: everything is unexpected
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: NativeErrorKind, class: ErrorClass) -> Self {
        self.entries.insert(kind, class);
        self
    }

    pub fn with_codes(mut self, codes: impl IntoIterator<Item = i32>, class: ErrorClass) -> Self {
        for code in codes {
            self.entries.insert(NativeErrorKind::Code(code), class);
        }
        self
    }

    pub fn with_operation_failure_codes(self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.with_codes(codes, ErrorClass::OperationFailure)
    }

    /// Mark a native shape as a uniqueness violation for inserts
    pub fn with_duplicate_key(mut self, kind: NativeErrorKind) -> Self {
        self.duplicate_key.insert(kind);
        self
    }

    /// Transport-level failures shared by every backend
    fn with_transport_defaults(self) -> Self {
        self.with(NativeErrorKind::Timeout, ErrorClass::OperationFailure)
            .with(NativeErrorKind::Disconnected, ErrorClass::OperationFailure)
            .with(NativeErrorKind::Rejected, ErrorClass::Programming)
    }

    /// Relational (MySQL) table
    pub fn mysql() -> Self {
        Self::new()
            .with_codes(MYSQL_PROGRAMMING_CODES, ErrorClass::Programming)
            .with_codes([MYSQL_DATA_TRUNCATED], ErrorClass::Programming)
            .with_codes(MYSQL_REJECTED_STATEMENT_CODES, ErrorClass::Programming)
            .with_operation_failure_codes(MYSQL_TRANSIENT_CODES)
            .with_duplicate_key(NativeErrorKind::Code(MYSQL_DUPLICATE_ENTRY))
            .with_transport_defaults()
    }

    /// Relational table extended with TiDB's transient codes
    pub fn tidb() -> Self {
        Self::mysql().with_operation_failure_codes([TIDB_TRY_AGAIN_LATER])
    }

    /// Wide-column (CQL) table
    pub fn cql() -> Self {
        use cql_codes::*;

        Self::new()
            .with_codes(
                [SYNTAX_ERROR, UNAUTHORIZED, INVALID, CONFIG_ERROR],
                ErrorClass::Programming,
            )
            .with_operation_failure_codes([
                UNAVAILABLE,
                OVERLOADED,
                IS_BOOTSTRAPPING,
                WRITE_TIMEOUT,
                READ_TIMEOUT,
            ])
            .with_transport_defaults()
    }

    pub fn class_of(&self, kind: &NativeErrorKind) -> ErrorClass {
        self.entries
            .get(kind)
            .copied()
            .unwrap_or(ErrorClass::Unexpected)
    }

    /// Map a native error onto the taxonomy
    pub fn classify(&self, err: NativeError, statement: StatementKind) -> CrudError {
        if statement == StatementKind::Create && self.duplicate_key.contains(&err.kind) {
            return CrudError::DuplicateKey {
                message: err.message.clone(),
                source: Some(err),
            };
        }

        match self.class_of(&err.kind) {
            ErrorClass::Programming => CrudError::Programming {
                message: err.to_string(),
                source: Some(err),
            },
            ErrorClass::OperationFailure => CrudError::OperationFailure { source: err },
            ErrorClass::Unexpected => CrudError::Unexpected { source: err },
        }
    }
}
