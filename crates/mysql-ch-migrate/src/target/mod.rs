//! ClickHouse target sink and DDL/insert statement builders.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::catalog::ColumnCatalog;
use crate::config::TargetConfig;
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use crate::value::{write_row_tuple, LiteralForm, Row};

/// Target-database behavior. Everything the engine needs from the target:
/// DDL execution, buffered row inserts, and the final row count.
#[async_trait]
pub trait TargetSink: Send + Sync {
    /// Execute a DDL statement.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Insert a buffer of rows using a prebuilt INSERT template (everything
    /// up to and including `VALUES `).
    async fn insert(&self, template: &str, rows: &[Row]) -> Result<()>;

    /// Count rows in the target table.
    async fn count(&self, table_ref: &str) -> Result<u64>;
}

/// ClickHouse implementation of [`TargetSink`] over the HTTP interface.
///
/// The underlying client is a stateless handle over a connection pool, so
/// one sink is shared across all insert workers.
#[derive(Clone)]
pub struct ClickHouseSink {
    client: clickhouse::Client,
}

impl ClickHouseSink {
    /// Create a sink and verify the server is reachable.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let client = clickhouse::Client::default()
            .with_url(config.url())
            .with_user(&config.user)
            .with_password(&config.password);

        // Fail fast with a context-carrying error before any work starts
        client.query("SELECT 1").execute().await.map_err(|e| {
            MigrateError::connection(
                e.to_string(),
                format!("connecting to ClickHouse at {}", config.url()),
            )
        })?;

        info!(url = %config.url(), "connected to ClickHouse target");

        Ok(Self { client })
    }

    /// Build a sink from an existing client. Used by tests.
    pub fn from_client(client: clickhouse::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TargetSink for ClickHouseSink {
    async fn execute(&self, sql: &str) -> Result<()> {
        debug!(sql, "executing DDL");
        self.client
            .query(sql)
            .execute()
            .await
            .map_err(|e| MigrateError::Ddl(format!("{}: {}", sql, e)))
    }

    async fn insert(&self, template: &str, rows: &[Row]) -> Result<()> {
        let mut sql = String::with_capacity(template.len() + rows.len() * 64);
        sql.push_str(template);
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            write_row_tuple(&mut sql, row, LiteralForm::ClickHouse);
        }
        self.client.query(&sql).execute().await?;
        Ok(())
    }

    async fn count(&self, table_ref: &str) -> Result<u64> {
        let count = self
            .client
            .query(&format!("SELECT count() FROM {}", table_ref))
            .fetch_one::<u64>()
            .await?;
        Ok(count)
    }
}

/// Quote a ClickHouse identifier with double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Fully quoted `database.table` reference for the target.
pub fn table_reference(database: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(database), quote_ident(table))
}

/// Apply the configured column-name casing.
fn target_column_name(name: &str, lowercase: bool) -> String {
    if lowercase {
        name.to_lowercase()
    } else {
        name.to_string()
    }
}

/// Build the INSERT statement prefix, ending in `VALUES ` so row tuples can
/// be appended directly. Built once per run, reused by every batch.
pub fn build_insert_template(
    database: &str,
    table: &str,
    catalog: &ColumnCatalog,
    lowercase: bool,
) -> String {
    let columns = catalog
        .columns()
        .iter()
        .map(|c| quote_ident(&target_column_name(&c.name, lowercase)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ",
        table_reference(database, table),
        columns
    )
}

/// Build the CREATE TABLE statement for the target, mapping each source
/// column type through the dialect and sorting by `sort_key`.
pub fn build_create_table<D: Dialect>(
    dialect: &D,
    database: &str,
    table: &str,
    catalog: &ColumnCatalog,
    sort_key: &[String],
    lowercase: bool,
) -> String {
    let columns = catalog
        .columns()
        .iter()
        .map(|c| {
            format!(
                "{} {}",
                quote_ident(&target_column_name(&c.name, lowercase)),
                dialect.convert_type(&c.source_type)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let order_by = sort_key
        .iter()
        .map(|c| quote_ident(&target_column_name(c, lowercase)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE = MergeTree() ORDER BY ({}) SETTINGS index_granularity = 8192",
        table_reference(database, table),
        columns,
        order_by
    )
}

/// Build the CREATE DATABASE statement for the target.
pub fn build_create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", quote_ident(database))
}

/// Build the DROP TABLE statement for the target.
pub fn build_drop_table(database: &str, table: &str) -> String {
    format!(
        "DROP TABLE IF EXISTS {}",
        table_reference(database, table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnDefinition;
    use crate::dialect::MysqlDialect;

    fn catalog() -> ColumnCatalog {
        ColumnCatalog::new(vec![
            ColumnDefinition {
                name: "Id".to_string(),
                source_type: "int".to_string(),
                is_primary_key: true,
            },
            ColumnDefinition {
                name: "CreatedAt".to_string(),
                source_type: "datetime".to_string(),
                is_primary_key: false,
            },
            ColumnDefinition {
                name: "Amount".to_string(),
                source_type: "decimal".to_string(),
                is_primary_key: false,
            },
        ])
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
        assert_eq!(quote_ident("od\"d"), "\"od\"\"d\"");
    }

    #[test]
    fn test_insert_template() {
        let template = build_insert_template("analytics", "orders", &catalog(), false);
        assert_eq!(
            template,
            "INSERT INTO \"analytics\".\"orders\" (\"Id\", \"CreatedAt\", \"Amount\") VALUES "
        );
    }

    #[test]
    fn test_insert_template_lowercase() {
        let template = build_insert_template("analytics", "orders", &catalog(), true);
        assert!(template.contains("\"id\", \"createdat\", \"amount\""));
    }

    #[test]
    fn test_create_table() {
        let ddl = build_create_table(
            &MysqlDialect::default(),
            "analytics",
            "orders",
            &catalog(),
            &["Id".to_string()],
            false,
        );
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS \"analytics\".\"orders\" \
             (\"Id\" Int32, \"CreatedAt\" DateTime, \"Amount\" Float64) \
             ENGINE = MergeTree() ORDER BY (\"Id\") SETTINGS index_granularity = 8192"
        );
    }

    #[test]
    fn test_create_table_lowercase_sort_key() {
        let ddl = build_create_table(
            &MysqlDialect::default(),
            "analytics",
            "orders",
            &catalog(),
            &["Id".to_string()],
            true,
        );
        assert!(ddl.contains("ORDER BY (\"id\")"));
        assert!(ddl.contains("\"createdat\" DateTime"));
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(
            build_drop_table("analytics", "orders"),
            "DROP TABLE IF EXISTS \"analytics\".\"orders\""
        );
    }
}
