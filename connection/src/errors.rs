use config::ConfigError;
use query_builder::BuildError;
use std::fmt;
use thiserror::Error;

/// Backend-agnostic shape of a native driver failure
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeErrorKind {
    /// Numeric code reported by the server
    Code(i32),
    /// The call outlived its deadline
    Timeout,
    /// Transport dropped or was never established
    Disconnected,
    /// The call was cancelled by the caller
    Interrupted,
    /// The driver refused the request before sending it
    Rejected,
    Other,
}

impl fmt::Display for NativeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeErrorKind::Code(code) => write!(f, "code {}", code),
            NativeErrorKind::Timeout => f.write_str("timeout"),
            NativeErrorKind::Disconnected => f.write_str("disconnected"),
            NativeErrorKind::Interrupted => f.write_str("interrupted"),
            NativeErrorKind::Rejected => f.write_str("rejected"),
            NativeErrorKind::Other => f.write_str("other"),
        }
    }
}

/// Error raised by a driver, before classification
#[derive(Error, Debug, Clone, PartialEq)]
#[error("({kind}) {message}")]
pub struct NativeError {
    pub kind: NativeErrorKind,
    pub message: String,
}

impl NativeError {
    pub fn new(kind: NativeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(code: i32, message: impl Into<String>) -> Self {
        Self::new(NativeErrorKind::Code(code), message)
    }

    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::new(
            NativeErrorKind::Timeout,
            format!("no response within {:.3}s", timeout.as_secs_f64()),
        )
    }
}

/// Closed error taxonomy surfaced to callers
#[derive(Error, Debug, Clone)]
pub enum CrudError {
    #[error("ConnectError: {source}")]
    Connect { source: NativeError },

    #[error("ProgrammingError: {message}")]
    Programming {
        message: String,
        source: Option<NativeError>,
    },

    #[error("OperationFailure: {source}")]
    OperationFailure { source: NativeError },

    #[error("UnexpectedError: {source}")]
    Unexpected { source: NativeError },

    #[error("DuplicateKeyError: {message}")]
    DuplicateKey {
        message: String,
        source: Option<NativeError>,
    },
}

/// Discriminant of [`CrudError`], for matching without destructuring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connect,
    Programming,
    OperationFailure,
    Unexpected,
    DuplicateKey,
}

impl CrudError {
    pub fn programming(message: impl Into<String>) -> Self {
        CrudError::Programming {
            message: message.into(),
            source: None,
        }
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        CrudError::DuplicateKey {
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CrudError::Connect { .. } => ErrorKind::Connect,
            CrudError::Programming { .. } => ErrorKind::Programming,
            CrudError::OperationFailure { .. } => ErrorKind::OperationFailure,
            CrudError::Unexpected { .. } => ErrorKind::Unexpected,
            CrudError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
        }
    }

    /// The underlying driver error, when there is one
    pub fn native(&self) -> Option<&NativeError> {
        match self {
            CrudError::Connect { source }
            | CrudError::OperationFailure { source }
            | CrudError::Unexpected { source } => Some(source),
            CrudError::Programming { source, .. } | CrudError::DuplicateKey { source, .. } => {
                source.as_ref()
            }
        }
    }

    /// Whether the retry budget may be spent on this error
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::OperationFailure
    }
}

impl From<BuildError> for CrudError {
    fn from(err: BuildError) -> Self {
        CrudError::programming(err.to_string())
    }
}

impl From<ConfigError> for CrudError {
    fn from(err: ConfigError) -> Self {
        CrudError::programming(err.to_string())
    }
}

pub type CrudResult<T> = Result<T, CrudError>;
