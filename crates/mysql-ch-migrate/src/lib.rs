//! Bulk single-table migration from MySQL/MariaDB into ClickHouse.
//!
//! Discovers the source table's schema, creates a matching MergeTree table
//! on the target, and copies the rows either as one ordered full scan or as
//! primary-key-ordered pages claimed by a pool of parallel workers.
//!
//! # Example
//!
//! ```no_run
//! use mysql_ch_migrate::{ClickHouseSink, Config, MigrationEngine, MysqlDialect};
//!
//! # async fn run() -> mysql_ch_migrate::Result<()> {
//! let config = Config::load("migrate.yaml")?;
//! let sink = ClickHouseSink::connect(&config.target).await?;
//! let engine = MigrationEngine::new(MysqlDialect::default(), sink, config);
//! let report = engine.run().await?;
//! println!("{} rows in {:.1}s", report.rows_read, report.duration_seconds);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod target;
pub mod typemap;
pub mod value;

pub use catalog::{ColumnCatalog, ColumnDefinition};
pub use config::{Config, MigrationConfig, RunMode, SourceConfig, TargetConfig};
pub use dialect::{BatchPage, Dialect, MysqlDialect};
pub use engine::{BatchCursor, MigrationEngine, MigrationReport, ProgressTracker};
pub use error::{MigrateError, Result};
pub use target::{ClickHouseSink, TargetSink};
pub use value::{LiteralForm, Row, SqlValue};
