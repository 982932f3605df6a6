//! Source dialect abstraction.
//!
//! A [`Dialect`] owns everything source-specific: connecting, schema
//! introspection, identifier quoting, and the SQL for both the sequential
//! full scan and the page-at-a-time parallel batch queries. The engine
//! drives the migration purely through this trait, which is what the mock
//! dialect in the integration tests relies on.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::catalog::ColumnCatalog;
use crate::config::SourceConfig;
use crate::error::Result;
use crate::value::Row;

pub mod mysql;

pub use mysql::MysqlDialect;

/// A resolved batch page: the rendered fetch query plus the number of rows
/// the key query found for this page.
#[derive(Debug, Clone)]
pub struct BatchPage {
    /// Fully rendered SELECT returning the page's rows.
    pub query: String,

    /// Number of key tuples found for this page. Strictly less than the
    /// batch size on the final non-empty page.
    pub rows_in_batch: usize,
}

/// Source-database behavior.
#[async_trait]
pub trait Dialect: Send + Sync {
    /// One connection per worker; workers never share connections.
    type Conn: Send + 'static;

    /// Open a new connection to the source.
    async fn connect(&self, config: &SourceConfig) -> Result<Self::Conn>;

    /// Introspect the source table's columns in ordinal order, with
    /// primary key membership flagged.
    async fn get_columns(
        &self,
        conn: &mut Self::Conn,
        database: &str,
        table: &str,
    ) -> Result<ColumnCatalog>;

    /// Map a source column type to the target's column type.
    fn convert_type(&self, source_type: &str) -> String;

    /// Fully quoted `database.table` reference for the source.
    fn table_reference(&self, database: &str, table: &str) -> String;

    /// Quoted, comma-separated projection of the catalog's columns.
    fn select_columns_clause(&self, catalog: &ColumnCatalog) -> String;

    /// The single ordered SELECT used by the sequential strategy.
    fn full_scan_query(&self, select_clause: &str, table_ref: &str, order_by: &[String]) -> String;

    /// Resolve one batch page: run the key query for `batch_index`, and if
    /// it returns any keys, build the row fetch query for exactly those
    /// keys. Returns `Ok(None)` once the key space is exhausted.
    async fn batch_query(
        &self,
        conn: &mut Self::Conn,
        primary_keys: &[String],
        select_clause: &str,
        table_ref: &str,
        batch_index: i64,
        batch_size: usize,
    ) -> Result<Option<BatchPage>>;

    /// Execute a rendered row query and decode every row.
    async fn fetch_rows(&self, conn: &mut Self::Conn, query: &str) -> Result<Vec<Row>>;

    /// Stream the full scan query, sending decoded rows in chunks of
    /// `chunk_size` through the channel. Consumes the connection; the
    /// sequential strategy runs this on its own task.
    async fn stream_full_scan(
        &self,
        conn: Self::Conn,
        query: String,
        chunk_size: usize,
        tx: mpsc::Sender<Vec<Row>>,
    ) -> Result<()>;
}
