//! # Configuration Management for crudhaus
//!
//! This crate provides the backend configuration shapes consumed by the
//! session layer, plus TOML/`.env` loading and validation.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CqlConfig, DatabaseConfig, SqlConfig};
//!
//! // Relational backend
//! let mysql = DatabaseConfig::Mysql(
//!     SqlConfig::new("127.0.0.1".to_string(), 3306, "root".to_string(), "secret".to_string())
//!         .with_max_op_fail_retry(3)
//!         .with_timeout(60.0),
//! );
//!
//! // Wide-column backend
//! let cassandra = DatabaseConfig::Cassandra(CqlConfig::new(vec!["127.0.0.1".to_string()]));
//! assert_ne!(mysql.canonical_key(), cassandra.canonical_key());
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [[databases]]
//! type = "mysql"
//! [databases.conf]
//! host = "127.0.0.1"
//! port = 3306
//! user = "root"
//! password = "secret"
//! max_op_fail_retry = 3
//! timeout = 60
//! tidb_patch = false
//!
//! [[databases]]
//! type = "cassandra"
//! [databases.conf]
//! hosts = ["127.0.0.1"]
//! username = "cassandra"
//! password = "cassandra"
//! max_op_fail_retry = 3
//! timeout = 60
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from crudhaus.toml (or the path in CRUDHAUS_CONFIG)
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./crudhaus.toml";

/// Default per-call timeout, in seconds (ten hours)
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 36000.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub databases: Vec<DatabaseConfig>,
}

/// One logical backend target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "conf", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Mysql(SqlConfig),
    Cassandra(CqlConfig),
}

/// Relational (MySQL protocol) backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlConfig {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub max_op_fail_retry: u32,
    /// Seconds; fractional values are allowed
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Extend the transient error set for TiDB
    #[serde(default)]
    pub tidb_patch: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,
}

/// Wide-column (CQL protocol) backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CqlConfig {
    pub hosts: Vec<String>,
    #[serde(default = "default_cql_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    #[serde(default)]
    pub max_op_fail_retry: u32,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_cql_port() -> u16 {
    9042
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl AppConfig {
    /// Load configuration from TOML file specified in .env or defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = {
            // A missing .env file is fine; a malformed one is not
            match dotenvy::dotenv() {
                Ok(_) => {}
                Err(err) if err.not_found() => {}
                Err(err) => return Err(err.into()),
            }

            if let Ok(config_path) = env::var("CRUDHAUS_CONFIG") {
                Self::from_file(&config_path)
            } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
                Self::from_file(DEFAULT_CONFIG_PATH)
            } else {
                Err(ConfigError::Invalid(format!(
                    "Config path must be specified in .env file as CRUDHAUS_CONFIG or in {} file",
                    DEFAULT_CONFIG_PATH
                )))
            }
        }?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.databases.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one database must be configured".to_string(),
            ));
        }
        for database in &self.databases {
            database.validate()?;
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// Canonical serialization, used as the registry key for pools
    pub fn canonical_key(&self) -> String {
        // Serializing plain data with string keys cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Short backend name, used in log spans
    pub fn backend_name(&self) -> &'static str {
        match self {
            DatabaseConfig::Mysql(conf) if conf.tidb_patch => "tidb",
            DatabaseConfig::Mysql(_) => "mysql",
            DatabaseConfig::Cassandra(_) => "cassandra",
        }
    }

    pub fn max_op_fail_retry(&self) -> u32 {
        match self {
            DatabaseConfig::Mysql(conf) => conf.max_op_fail_retry,
            DatabaseConfig::Cassandra(conf) => conf.max_op_fail_retry,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            DatabaseConfig::Mysql(conf) => conf.timeout_duration(),
            DatabaseConfig::Cassandra(conf) => conf.timeout_duration(),
        }
    }

    pub fn retry_backoff(&self) -> Option<Duration> {
        let millis = match self {
            DatabaseConfig::Mysql(conf) => conf.retry_backoff_ms,
            DatabaseConfig::Cassandra(conf) => conf.retry_backoff_ms,
        };
        millis.map(Duration::from_millis)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DatabaseConfig::Mysql(conf) => {
                if conf.host.is_empty() {
                    return Err(ConfigError::Invalid(
                        "Database host cannot be empty".to_string(),
                    ));
                }
                if conf.port == 0 {
                    return Err(ConfigError::Invalid(
                        "Database port cannot be zero".to_string(),
                    ));
                }
                if conf.user.is_empty() {
                    return Err(ConfigError::Invalid(
                        "Database user cannot be empty".to_string(),
                    ));
                }
                validate_timeout(conf.timeout)
            }
            DatabaseConfig::Cassandra(conf) => {
                if conf.hosts.is_empty() || conf.hosts.iter().any(|h| h.is_empty()) {
                    return Err(ConfigError::Invalid(
                        "Cassandra hosts cannot be empty".to_string(),
                    ));
                }
                if conf.port == 0 {
                    return Err(ConfigError::Invalid(
                        "Cassandra port cannot be zero".to_string(),
                    ));
                }
                if conf.username.is_some() && conf.password.is_none() {
                    return Err(ConfigError::Invalid(
                        "Cassandra password is required when username is set".to_string(),
                    ));
                }
                validate_timeout(conf.timeout)
            }
        }
    }
}

fn validate_timeout(timeout: f64) -> Result<(), ConfigError> {
    if !timeout.is_finite() || timeout <= 0.0 {
        return Err(ConfigError::Invalid(
            "Database timeout must be a positive number of seconds".to_string(),
        ));
    }
    Ok(())
}

impl SqlConfig {
    /// Create a new relational configuration with default retry/timeout
    pub fn new(host: String, port: u16, user: String, password: String) -> Self {
        Self {
            host,
            port,
            user,
            password,
            database: None,
            max_op_fail_retry: 0,
            timeout: DEFAULT_TIMEOUT_SECONDS,
            tidb_patch: false,
            retry_backoff_ms: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_max_op_fail_retry(mut self, retries: u32) -> Self {
        self.max_op_fail_retry = retries;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_tidb_patch(mut self, enabled: bool) -> Self {
        self.tidb_patch = enabled;
        self
    }

    pub fn with_retry_backoff_ms(mut self, millis: u64) -> Self {
        self.retry_backoff_ms = Some(millis);
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        seconds_to_duration(self.timeout)
    }
}

impl CqlConfig {
    /// Create a new wide-column configuration with default retry/timeout
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            hosts,
            port: default_cql_port(),
            username: None,
            password: None,
            keyspace: None,
            max_op_fail_retry: 0,
            timeout: DEFAULT_TIMEOUT_SECONDS,
            retry_backoff_ms: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn with_max_op_fail_retry(mut self, retries: u32) -> Self {
        self.max_op_fail_retry = retries;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_retry_backoff_ms(mut self, millis: u64) -> Self {
        self.retry_backoff_ms = Some(millis);
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        seconds_to_duration(self.timeout)
    }

    /// Contact points as `host:port`, keeping explicit ports untouched
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| {
                if host.contains(':') {
                    host.clone()
                } else {
                    format!("{}:{}", host, self.port)
                }
            })
            .collect()
    }
}

fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds)
        .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql() -> DatabaseConfig {
        DatabaseConfig::Mysql(SqlConfig::new(
            "127.0.0.1".to_string(),
            3306,
            "root".to_string(),
            "secret".to_string(),
        ))
    }

    #[test]
    fn test_defaults() {
        let config = mysql();
        assert_eq!(config.max_op_fail_retry(), 0);
        assert_eq!(config.timeout(), Duration::from_secs(36000));
        assert_eq!(config.retry_backoff(), None);
        assert_eq!(config.backend_name(), "mysql");
    }

    #[test]
    fn test_canonical_key_is_stable_and_discriminating() {
        assert_eq!(mysql().canonical_key(), mysql().canonical_key());

        let tidb = match mysql() {
            DatabaseConfig::Mysql(conf) => DatabaseConfig::Mysql(conf.with_tidb_patch(true)),
            other => other,
        };
        assert_ne!(mysql().canonical_key(), tidb.canonical_key());
        assert_eq!(tidb.backend_name(), "tidb");
    }

    #[test]
    fn test_canonical_key_shape() {
        let key = mysql().canonical_key();
        assert!(key.starts_with(r#"{"type":"mysql","conf":{"#));
        assert!(key.contains(r#""host":"127.0.0.1""#));
    }

    #[test]
    fn test_parse_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [[databases]]
            type = "mysql"
            [databases.conf]
            host = "localhost"
            user = "root"
            password = "pw"
            max_op_fail_retry = 3
            timeout = 0.5
            tidb_patch = true

            [[databases]]
            type = "cassandra"
            [databases.conf]
            hosts = ["10.0.0.1", "10.0.0.2:9043"]
            "#,
        )
        .unwrap();

        assert_eq!(config.databases.len(), 2);
        match &config.databases[0] {
            DatabaseConfig::Mysql(conf) => {
                assert_eq!(conf.port, 3306);
                assert_eq!(conf.max_op_fail_retry, 3);
                assert!(conf.tidb_patch);
                assert_eq!(conf.timeout_duration(), Duration::from_millis(500));
            }
            other => panic!("expected mysql, got {:?}", other),
        }
        match &config.databases[1] {
            DatabaseConfig::Cassandra(conf) => {
                assert_eq!(
                    conf.contact_points(),
                    vec!["10.0.0.1:9042".to_string(), "10.0.0.2:9043".to_string()]
                );
                assert_eq!(conf.timeout, DEFAULT_TIMEOUT_SECONDS);
            }
            other => panic!("expected cassandra, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_errors() {
        assert!(AppConfig::from_toml_str("databases = []").is_err());

        let empty_host = DatabaseConfig::Mysql(SqlConfig::new(
            String::new(),
            3306,
            "root".to_string(),
            String::new(),
        ));
        assert!(matches!(empty_host.validate(), Err(ConfigError::Invalid(_))));

        let bad_timeout = match mysql() {
            DatabaseConfig::Mysql(conf) => DatabaseConfig::Mysql(conf.with_timeout(0.0)),
            other => other,
        };
        assert!(bad_timeout.validate().is_err());

        let mut cql = CqlConfig::new(vec!["127.0.0.1".to_string()]);
        cql.username = Some("user".to_string());
        assert!(DatabaseConfig::Cassandra(cql).validate().is_err());
    }
}
