//! Configuration loading and validation.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Root configuration structure, fixed for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (MySQL).
    pub source: SourceConfig,

    /// Target database configuration (ClickHouse).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Source database name.
    pub database: String,

    /// Source table name.
    pub table: String,
}

/// Target database (ClickHouse) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// ClickHouse HTTP host (default: localhost).
    #[serde(default = "default_localhost")]
    pub host: String,

    /// ClickHouse HTTP port (default: 8123).
    #[serde(default = "default_clickhouse_port")]
    pub port: u16,

    /// Username (default: "default").
    #[serde(default = "default_ch_user")]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Target database name.
    pub database: String,

    /// Target table name.
    pub table: String,
}

impl TargetConfig {
    /// HTTP endpoint URL for the clickhouse client.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Execution mode for the copy phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Single full-scan cursor on one connection.
    Sequential,

    /// Fixed pool of workers claiming primary-key-ordered pages.
    #[default]
    Parallel,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows per page / insert buffer flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Worker count for parallel mode.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Execution mode (default: parallel).
    #[serde(default)]
    pub mode: RunMode,

    /// Explicit sort columns, overriding the primary key as the target
    /// table's sort key. Required when the source table has no primary key.
    #[serde(default)]
    pub order_by: Vec<String>,

    /// Lowercase column names in the target table.
    #[serde(default)]
    pub lowercase: bool,

    /// Drop the target table before creating it.
    #[serde(default)]
    pub drop_target: bool,

    /// Log every generated SQL statement at debug level.
    #[serde(default)]
    pub trace: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            threads: default_threads(),
            mode: RunMode::default(),
            order_by: Vec::new(),
            lowercase: false,
            drop_target: false,
            trace: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration surface (not the source schema; the
    /// engine checks pagination preconditions against the live catalog).
    pub fn validate(&self) -> Result<()> {
        if self.source.host.is_empty() {
            return Err(MigrateError::Config("source.host is required".into()));
        }
        if self.source.database.is_empty() {
            return Err(MigrateError::Config("source.database is required".into()));
        }
        if self.source.table.is_empty() {
            return Err(MigrateError::Config("source.table is required".into()));
        }
        if self.source.user.is_empty() {
            return Err(MigrateError::Config("source.user is required".into()));
        }
        if self.target.database.is_empty() {
            return Err(MigrateError::Config("target.database is required".into()));
        }
        if self.target.table.is_empty() {
            return Err(MigrateError::Config("target.table is required".into()));
        }
        if self.migration.batch_size == 0 {
            return Err(MigrateError::Config(
                "migration.batch_size must be at least 1".into(),
            ));
        }
        if self.migration.threads == 0 {
            return Err(MigrateError::Config(
                "migration.threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// Passwords never appear in Debug output (configs get logged).
impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish()
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish()
    }
}

// Default value functions for serde
fn default_mysql_port() -> u16 {
    3306
}

fn default_clickhouse_port() -> u16 {
    8123
}

fn default_localhost() -> String {
    "localhost".to_string()
}

fn default_ch_user() -> String {
    "default".to_string()
}

fn default_batch_size() -> usize {
    10_000
}

fn default_threads() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            source: SourceConfig {
                host: "localhost".to_string(),
                port: 3306,
                user: "root".to_string(),
                password: "secret".to_string(),
                database: "shop".to_string(),
                table: "orders".to_string(),
            },
            target: TargetConfig {
                host: "localhost".to_string(),
                port: 8123,
                user: "default".to_string(),
                password: String::new(),
                database: "analytics".to_string(),
                table: "orders".to_string(),
            },
            migration: MigrationConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_source_table() {
        let mut config = valid_config();
        config.source.table = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = valid_config();
        config.migration.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = valid_config();
        config.migration.threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_defaults() {
        let yaml = r#"
source:
  host: db.internal
  user: reader
  database: shop
  table: orders
target:
  database: analytics
  table: orders
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.port, 3306);
        assert_eq!(config.target.port, 8123);
        assert_eq!(config.target.user, "default");
        assert_eq!(config.migration.batch_size, 10_000);
        assert_eq!(config.migration.mode, RunMode::Parallel);
        assert!(!config.migration.drop_target);
    }

    #[test]
    fn test_mode_parsing() {
        let yaml = r#"
source: { host: h, user: u, database: d, table: t }
target: { database: d, table: t }
migration: { mode: sequential, threads: 2 }
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.migration.mode, RunMode::Sequential);
        assert_eq!(config.migration.threads, 2);
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config = valid_config();
        let debug_output = format!("{:?}", config.source);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("secret"));
    }
}
