//! Relational driver over the MySQL wire protocol

use crate::driver::{Driver, NativeConnection};
use crate::errors::{NativeError, NativeErrorKind};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use config::SqlConfig;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, MySql, Row, TypeInfo, ValueRef};
use std::time::Duration;
use type_mapping::{mysql_type_family, Record, TypeFamily, Value};

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// Opens one `MySqlConnection` per handle
#[derive(Debug, Clone)]
pub struct MySqlDriver {
    config: SqlConfig,
}

impl MySqlDriver {
    pub fn new(config: SqlConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .charset("utf8mb4");

        match &self.config.database {
            Some(database) => options.database(database),
            None => options,
        }
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn connect(&self) -> Result<Box<dyn NativeConnection>, NativeError> {
        let conn = MySqlConnection::connect_with(&self.connect_options())
            .await
            .map_err(native_error)?;
        crate::debug_log!(host = %self.config.host, port = self.config.port, "mysql connection opened");
        Ok(Box::new(MySqlNativeConnection { conn }))
    }
}

pub struct MySqlNativeConnection {
    conn: MySqlConnection,
}

#[async_trait]
impl NativeConnection for MySqlNativeConnection {
    async fn query(
        &mut self,
        query: &str,
        params: &[Value],
        _timeout: Duration,
    ) -> Result<Vec<Record>, NativeError> {
        let mut statement = sqlx::query(query);
        for param in params {
            statement = bind_value(statement, param)?;
        }

        let rows = statement.fetch_all(&mut self.conn).await.map_err(native_error)?;
        rows.iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(native_error)
    }

    async fn close(self: Box<Self>) -> Result<(), NativeError> {
        self.conn.close().await.map_err(native_error)
    }
}

fn bind_value<'q>(query: MySqlQuery<'q>, value: &Value) -> Result<MySqlQuery<'q>, NativeError> {
    let query = match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(bytes) => query.bind(bytes.clone()),
        Value::Uuid(uuid) => query.bind(uuid.hyphenated().to_string()),
        Value::DateTime(dt) => query.bind(*dt),
        Value::DateTimeTz(dt) => query.bind(dt.naive_utc()),
        Value::Json(json) => query.bind(sqlx::types::Json(json.clone())),
        Value::List(_) => {
            return Err(NativeError::new(
                NativeErrorKind::Rejected,
                "a list cannot be bound to a single placeholder",
            ))
        }
    };
    Ok(query)
}

fn decode_row(row: &MySqlRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = if row.try_get_raw(index)?.is_null() {
            Value::Null
        } else {
            decode_cell(row, index, mysql_type_family(column.type_info().name()))?
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_cell(row: &MySqlRow, index: usize, family: TypeFamily) -> Result<Value, sqlx::Error> {
    let value = match family {
        TypeFamily::Bool => Value::Bool(row.try_get::<bool, _>(index)?),
        TypeFamily::SignedInt => Value::Int(row.try_get_unchecked::<i64, _>(index)?),
        TypeFamily::UnsignedInt => {
            let unsigned = row.try_get_unchecked::<u64, _>(index)?;
            match i64::try_from(unsigned) {
                Ok(signed) => Value::Int(signed),
                Err(_) => Value::Text(unsigned.to_string()),
            }
        }
        TypeFamily::Float => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        TypeFamily::Double => Value::Float(row.try_get::<f64, _>(index)?),
        TypeFamily::Text => Value::Text(row.try_get::<String, _>(index)?),
        TypeFamily::Bytes => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
        TypeFamily::DateTime => Value::DateTime(row.try_get::<NaiveDateTime, _>(index)?),
        TypeFamily::Timestamp => {
            Value::DateTime(row.try_get::<DateTime<Utc>, _>(index)?.naive_utc())
        }
        TypeFamily::Date => Value::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        TypeFamily::Time => Value::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        TypeFamily::Json => {
            Value::Json(row.try_get::<sqlx::types::Json<serde_json::Value>, _>(index)?.0)
        }
        TypeFamily::Other => Value::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

/// Reduce a sqlx error to its native shape
fn native_error(err: sqlx::Error) -> NativeError {
    let kind = match &err {
        sqlx::Error::Database(db) => match db.try_downcast_ref::<MySqlDatabaseError>() {
            Some(mysql) => NativeErrorKind::Code(i32::from(mysql.number())),
            None => NativeErrorKind::Other,
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::WorkerCrashed => NativeErrorKind::Disconnected,
        _ => NativeErrorKind::Other,
    };
    NativeError::new(kind, err.to_string())
}
