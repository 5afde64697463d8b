//! Wide-column driver over the CQL protocol

use crate::driver::{Driver, NativeConnection};
use crate::errors::{NativeError, NativeErrorKind};
use async_trait::async_trait;
use chrono::DateTime;
use config::CqlConfig;
use scylla::frame::response::result::{ColumnType, CqlValue, Row};
use scylla::frame::value::CqlTimestamp;
use scylla::prepared_statement::PreparedStatement;
use scylla::query::Query;
use scylla::transport::errors::{DbError, QueryError};
use scylla::{QueryResult, Session, SessionBuilder};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use type_mapping::{Record, Value};

/// Prepared statements kept per connection before the least recently used is evicted
pub const PREPARED_CACHE_CAPACITY: usize = 256;

/// Bounded prepared statement cache keyed by query text
pub(crate) struct StatementCache<S> {
    entries: LruCache<String, S>,
}

impl<S: Clone> StatementCache<S> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub(crate) fn get(&mut self, query: &str) -> Option<S> {
        self.entries.get(query).cloned()
    }

    pub(crate) fn put(&mut self, query: &str, statement: S) {
        self.entries.put(query.to_string(), statement);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Opens one `Session` per handle
#[derive(Debug, Clone)]
pub struct ScyllaDriver {
    config: CqlConfig,
}

impl ScyllaDriver {
    pub fn new(config: CqlConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Driver for ScyllaDriver {
    async fn connect(&self) -> Result<Box<dyn NativeConnection>, NativeError> {
        let contact_points = self.config.contact_points();
        let mut builder = SessionBuilder::new().known_nodes(&contact_points);

        if let (Some(user), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.user(user, password);
        }
        if let Some(keyspace) = &self.config.keyspace {
            builder = builder.use_keyspace(keyspace, false);
        }

        let session = builder
            .build()
            .await
            .map_err(|e| NativeError::new(NativeErrorKind::Disconnected, e.to_string()))?;
        crate::debug_log!(nodes = ?contact_points, "cql session opened");

        Ok(Box::new(ScyllaConnection {
            session,
            prepared: StatementCache::new(PREPARED_CACHE_CAPACITY),
        }))
    }
}

/// One session plus the statements prepared on it
pub struct ScyllaConnection {
    session: Session,
    prepared: StatementCache<PreparedStatement>,
}

impl ScyllaConnection {
    async fn prepared(&mut self, query: &str) -> Result<PreparedStatement, NativeError> {
        if let Some(statement) = self.prepared.get(query) {
            return Ok(statement);
        }
        let statement = self.session.prepare(query).await.map_err(query_error)?;
        self.prepared.put(query, statement.clone());
        Ok(statement)
    }
}

#[async_trait]
impl NativeConnection for ScyllaConnection {
    async fn query(
        &mut self,
        query: &str,
        params: &[Value],
        timeout: Duration,
    ) -> Result<Vec<Record>, NativeError> {
        let result = if params.is_empty() {
            let mut statement = Query::new(query);
            statement.set_request_timeout(Some(timeout));
            self.session
                .query_unpaged(statement, ())
                .await
                .map_err(query_error)?
        } else {
            let mut statement = self.prepared(query).await?;
            statement.set_request_timeout(Some(timeout));

            let specs = statement.get_variable_col_specs();
            if specs.len() != params.len() {
                return Err(NativeError::new(
                    NativeErrorKind::Rejected,
                    format!("expected {} parameters, got {}", specs.len(), params.len()),
                ));
            }
            let values = params
                .iter()
                .zip(specs.iter())
                .map(|(value, spec)| to_cql(value, &spec.typ))
                .collect::<Result<Vec<_>, _>>()?;

            self.session
                .execute_unpaged(&statement, values)
                .await
                .map_err(query_error)?
        };

        Ok(decode_rows(result))
    }

    async fn close(self: Box<Self>) -> Result<(), NativeError> {
        // Dropping the session tears down its connections
        drop(self.session);
        Ok(())
    }
}

fn decode_rows(result: QueryResult) -> Vec<Record> {
    let specs = result.col_specs().to_owned();
    let rows: Vec<Row> = result.rows_or_empty();
    rows.iter()
        .map(|row| {
            specs
                .iter()
                .enumerate()
                .map(|(i, spec)| {
                    let value = match row.columns.get(i).and_then(|c| c.as_ref()) {
                        Some(cql) => from_cql(cql),
                        None => Value::Null,
                    };
                    (spec.name.clone(), value)
                })
                .collect()
        })
        .collect()
}

fn rejected(value: &Value, typ: &ColumnType) -> NativeError {
    NativeError::new(
        NativeErrorKind::Rejected,
        format!("cannot bind {} value to column of type {:?}", value.type_name(), typ),
    )
}

/// Coerce a bound value into the column type the server expects
fn to_cql(value: &Value, typ: &ColumnType) -> Result<Option<CqlValue>, NativeError> {
    let cql = match (value, typ) {
        (Value::Null, _) => return Ok(None),
        (Value::Bool(b), _) => CqlValue::Boolean(*b),
        (Value::Int(i), ColumnType::Int) => {
            CqlValue::Int(i32::try_from(*i).map_err(|_| rejected(value, typ))?)
        }
        (Value::Int(i), ColumnType::SmallInt) => {
            CqlValue::SmallInt(i16::try_from(*i).map_err(|_| rejected(value, typ))?)
        }
        (Value::Int(i), ColumnType::TinyInt) => {
            CqlValue::TinyInt(i8::try_from(*i).map_err(|_| rejected(value, typ))?)
        }
        (Value::Int(i), ColumnType::Float) => CqlValue::Float(*i as f32),
        (Value::Int(i), ColumnType::Double) => CqlValue::Double(*i as f64),
        (Value::Int(i), ColumnType::Timestamp) => CqlValue::Timestamp(CqlTimestamp(*i)),
        (Value::Int(i), ColumnType::Text) => CqlValue::Text(i.to_string()),
        (Value::Int(i), _) => CqlValue::BigInt(*i),
        (Value::Float(f), ColumnType::Float) => CqlValue::Float(*f as f32),
        (Value::Float(f), _) => CqlValue::Double(*f),
        (Value::Text(s), ColumnType::Ascii) => CqlValue::Ascii(s.clone()),
        (Value::Text(s), ColumnType::Uuid) => {
            CqlValue::Uuid(s.parse().map_err(|_| rejected(value, typ))?)
        }
        (Value::Text(s), _) => CqlValue::Text(s.clone()),
        (Value::Bytes(bytes), _) => CqlValue::Blob(bytes.clone()),
        (Value::Uuid(uuid), ColumnType::Text) => CqlValue::Text(uuid.to_string()),
        (Value::Uuid(uuid), _) => CqlValue::Uuid(*uuid),
        (Value::DateTime(dt), _) => {
            CqlValue::Timestamp(CqlTimestamp(dt.and_utc().timestamp_millis()))
        }
        (Value::DateTimeTz(dt), _) => CqlValue::Timestamp(CqlTimestamp(dt.timestamp_millis())),
        (Value::Json(json), _) => CqlValue::Text(json.to_string()),
        (Value::List(items), ColumnType::List(inner)) => CqlValue::List(collection_items(items, inner)?),
        (Value::List(items), ColumnType::Set(inner)) => CqlValue::Set(collection_items(items, inner)?),
        (Value::List(_), _) => return Err(rejected(value, typ)),
    };
    Ok(Some(cql))
}

fn collection_items(items: &[Value], inner: &ColumnType) -> Result<Vec<CqlValue>, NativeError> {
    items
        .iter()
        .map(|item| to_cql(item, inner)?.ok_or_else(|| rejected(item, inner)))
        .collect()
}

fn from_cql(value: &CqlValue) -> Value {
    match value {
        CqlValue::Boolean(b) => Value::Bool(*b),
        CqlValue::TinyInt(i) => Value::Int(i64::from(*i)),
        CqlValue::SmallInt(i) => Value::Int(i64::from(*i)),
        CqlValue::Int(i) => Value::Int(i64::from(*i)),
        CqlValue::BigInt(i) => Value::Int(*i),
        CqlValue::Counter(c) => Value::Int(c.0),
        CqlValue::Float(f) => Value::Float(f64::from(*f)),
        CqlValue::Double(f) => Value::Float(*f),
        CqlValue::Ascii(s) | CqlValue::Text(s) => Value::Text(s.clone()),
        CqlValue::Blob(bytes) => Value::Bytes(bytes.clone()),
        CqlValue::Uuid(u) => Value::Uuid(*u),
        CqlValue::Timeuuid(u) => Value::Text(u.to_string()),
        CqlValue::Timestamp(ts) => match DateTime::from_timestamp_millis(ts.0) {
            Some(dt) => Value::DateTime(dt.naive_utc()),
            None => Value::Int(ts.0),
        },
        CqlValue::List(items) | CqlValue::Set(items) => {
            Value::List(items.iter().map(from_cql).collect())
        }
        other => Value::Text(format!("{:?}", other)),
    }
}

/// Server error codes as defined by the native protocol
fn db_error_code(err: &DbError) -> i32 {
    match err {
        DbError::ServerError => 0x0000,
        DbError::ProtocolError => 0x000A,
        DbError::AuthenticationError => 0x0100,
        DbError::Unavailable { .. } => 0x1000,
        DbError::Overloaded => 0x1001,
        DbError::IsBootstrapping => 0x1002,
        DbError::TruncateError => 0x1003,
        DbError::WriteTimeout { .. } => 0x1100,
        DbError::ReadTimeout { .. } => 0x1200,
        DbError::ReadFailure { .. } => 0x1300,
        DbError::FunctionFailure { .. } => 0x1400,
        DbError::WriteFailure { .. } => 0x1500,
        DbError::SyntaxError => 0x2000,
        DbError::Unauthorized => 0x2100,
        DbError::Invalid => 0x2200,
        DbError::ConfigError => 0x2300,
        DbError::AlreadyExists { .. } => 0x2400,
        DbError::Unprepared { .. } => 0x2500,
        DbError::Other(code) => *code,
        _ => -1,
    }
}

fn query_error(err: QueryError) -> NativeError {
    let kind = match &err {
        QueryError::DbError(db, _) => NativeErrorKind::Code(db_error_code(db)),
        QueryError::RequestTimeout(_) | QueryError::TimeoutError => NativeErrorKind::Timeout,
        QueryError::IoError(_) => NativeErrorKind::Disconnected,
        QueryError::BadQuery(_) => NativeErrorKind::Rejected,
        _ => NativeErrorKind::Other,
    };
    NativeError::new(kind, err.to_string())
}
