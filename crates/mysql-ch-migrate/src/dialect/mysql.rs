//! MySQL/MariaDB source dialect.
//!
//! Uses SQLx for async query execution. Each worker gets its own
//! [`MySqlConnection`]; the parallel strategy never shares one.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode};
use sqlx::{Column, ConnectOptions, Row as SqlxRow, TypeInfo, ValueRef};
use tokio::sync::mpsc;
use tracing::debug;

use crate::catalog::{ColumnCatalog, ColumnDefinition};
use crate::config::SourceConfig;
use crate::dialect::{BatchPage, Dialect};
use crate::error::{MigrateError, Result};
use crate::typemap;
use crate::value::{write_row_tuple, LiteralForm, Row, SqlValue};

/// MySQL/MariaDB implementation of [`Dialect`].
#[derive(Default)]
pub struct MysqlDialect {
    trace: bool,
}

impl MysqlDialect {
    /// With `trace` set, every generated key-window query is logged at
    /// debug level.
    pub fn new(trace: bool) -> Self {
        Self { trace }
    }
}

/// Quote a MySQL identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[async_trait]
impl Dialect for MysqlDialect {
    type Conn = MySqlConnection;

    async fn connect(&self, config: &SourceConfig) -> Result<Self::Conn> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let conn = options.connect().await.map_err(|e| {
            MigrateError::connection(
                e.to_string(),
                format!(
                    "connecting to MySQL at {}:{}/{}",
                    config.host, config.port, config.database
                ),
            )
        })?;

        debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "opened MySQL connection"
        );

        Ok(conn)
    }

    async fn get_columns(
        &self,
        conn: &mut Self::Conn,
        database: &str,
        table: &str,
    ) -> Result<ColumnCatalog> {
        // CAST to CHAR to sidestep collation differences across MySQL versions
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(DATA_TYPE AS CHAR(255)) AS DATA_TYPE,
                IF(COLUMN_KEY = 'PRI', 1, 0) AS is_primary_key
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(database)
            .bind(table)
            .fetch_all(conn)
            .await?;

        if rows.is_empty() {
            return Err(MigrateError::Schema(format!(
                "table {}.{} not found or has no columns",
                database, table
            )));
        }

        let columns = rows
            .iter()
            .map(|row| ColumnDefinition {
                name: row.get::<String, _>("COLUMN_NAME"),
                source_type: row.get::<String, _>("DATA_TYPE"),
                is_primary_key: row.get::<i32, _>("is_primary_key") == 1,
            })
            .collect();

        Ok(ColumnCatalog::new(columns))
    }

    fn convert_type(&self, source_type: &str) -> String {
        typemap::mysql_to_clickhouse(source_type).to_string()
    }

    fn table_reference(&self, database: &str, table: &str) -> String {
        format!("{}.{}", quote_ident(database), quote_ident(table))
    }

    fn select_columns_clause(&self, catalog: &ColumnCatalog) -> String {
        catalog
            .columns()
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn full_scan_query(&self, select_clause: &str, table_ref: &str, order_by: &[String]) -> String {
        let order_clause = order_by
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {} FROM {} ORDER BY {}",
            select_clause, table_ref, order_clause
        )
    }

    async fn batch_query(
        &self,
        conn: &mut Self::Conn,
        primary_keys: &[String],
        select_clause: &str,
        table_ref: &str,
        batch_index: i64,
        batch_size: usize,
    ) -> Result<Option<BatchPage>> {
        let key_clause = primary_keys
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let key_query = key_window_query(&key_clause, table_ref, batch_index, batch_size);
        if self.trace {
            debug!(sql = %key_query, "key window");
        }

        let key_rows = self.fetch_rows(conn, &key_query).await?;
        if key_rows.is_empty() {
            return Ok(None);
        }

        let predicate = render_key_predicate(primary_keys, &key_rows);
        let query = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {}",
            select_clause, table_ref, predicate, key_clause
        );

        Ok(Some(BatchPage {
            query,
            rows_in_batch: key_rows.len(),
        }))
    }

    async fn fetch_rows(&self, conn: &mut Self::Conn, query: &str) -> Result<Vec<Row>> {
        let rows: Vec<MySqlRow> = sqlx::query(query).fetch_all(conn).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn stream_full_scan(
        &self,
        conn: Self::Conn,
        query: String,
        chunk_size: usize,
        tx: mpsc::Sender<Vec<Row>>,
    ) -> Result<()> {
        let mut conn = conn;
        let mut stream = sqlx::query(&query).fetch(&mut conn);
        let mut chunk: Vec<Row> = Vec::with_capacity(chunk_size);

        while let Some(row) = stream.try_next().await? {
            chunk.push(decode_row(&row));
            if chunk.len() >= chunk_size {
                let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
                if tx.send(full).await.is_err() {
                    // Receiver dropped: the insert side failed and the
                    // engine already holds its error.
                    return Ok(());
                }
            }
        }

        if !chunk.is_empty() && tx.send(chunk).await.is_err() {
            return Ok(());
        }

        Ok(())
    }
}

/// Build the lightweight first-phase query for one batch: primary-key
/// columns only, ordered by them, restricted to the batch's offset window.
fn key_window_query(
    key_clause: &str,
    table_ref: &str,
    batch_index: i64,
    batch_size: usize,
) -> String {
    let offset = batch_index * batch_size as i64;
    format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT {}, {}",
        key_clause, table_ref, key_clause, offset, batch_size
    )
}

/// Build the membership predicate restricting the row fetch to exactly the
/// key tuples the key query returned.
fn render_key_predicate(primary_keys: &[String], key_rows: &[Row]) -> String {
    let mut sql = String::new();

    if primary_keys.len() == 1 {
        sql.push_str(&quote_ident(&primary_keys[0]));
        sql.push_str(" IN (");
        for (i, row) in key_rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&row[0].to_sql_literal(LiteralForm::Mysql));
        }
        sql.push(')');
    } else {
        sql.push('(');
        sql.push_str(
            &primary_keys
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
        );
        sql.push_str(") IN (");
        for (i, row) in key_rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            write_row_tuple(&mut sql, row, LiteralForm::Mysql);
        }
        sql.push(')');
    }

    sql
}

/// Decode a MySQL row into owned values, driven by the wire type names
/// SQLx reports for each column.
fn decode_row(row: &MySqlRow) -> Row {
    (0..row.columns().len())
        .map(|i| {
            let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
            if is_null {
                return SqlValue::Null;
            }

            match row.columns()[i].type_info().name() {
                "BOOLEAN" | "BIT" => row
                    .try_get::<bool, _>(i)
                    .map(SqlValue::Bool)
                    .unwrap_or(SqlValue::Null),

                "TINYINT" => row
                    .try_get::<i8, _>(i)
                    .map(|v| SqlValue::Int(v as i64))
                    .unwrap_or(SqlValue::Null),
                "SMALLINT" => row
                    .try_get::<i16, _>(i)
                    .map(|v| SqlValue::Int(v as i64))
                    .unwrap_or(SqlValue::Null),
                "MEDIUMINT" | "INT" => row
                    .try_get::<i32, _>(i)
                    .map(|v| SqlValue::Int(v as i64))
                    .unwrap_or(SqlValue::Null),
                "BIGINT" => row
                    .try_get::<i64, _>(i)
                    .map(SqlValue::Int)
                    .unwrap_or(SqlValue::Null),

                "TINYINT UNSIGNED" => row
                    .try_get::<u8, _>(i)
                    .map(|v| SqlValue::UInt(v as u64))
                    .unwrap_or(SqlValue::Null),
                "SMALLINT UNSIGNED" => row
                    .try_get::<u16, _>(i)
                    .map(|v| SqlValue::UInt(v as u64))
                    .unwrap_or(SqlValue::Null),
                "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => row
                    .try_get::<u32, _>(i)
                    .map(|v| SqlValue::UInt(v as u64))
                    .unwrap_or(SqlValue::Null),
                "BIGINT UNSIGNED" => row
                    .try_get::<u64, _>(i)
                    .map(SqlValue::UInt)
                    .unwrap_or(SqlValue::Null),

                "FLOAT" => row
                    .try_get::<f32, _>(i)
                    .map(SqlValue::Float)
                    .unwrap_or(SqlValue::Null),
                "DOUBLE" => row
                    .try_get::<f64, _>(i)
                    .map(SqlValue::Double)
                    .unwrap_or(SqlValue::Null),
                "DECIMAL" => row
                    .try_get::<rust_decimal::Decimal, _>(i)
                    .map(SqlValue::Decimal)
                    .unwrap_or(SqlValue::Null),

                "DATE" => row
                    .try_get::<chrono::NaiveDate, _>(i)
                    .map(SqlValue::Date)
                    .unwrap_or(SqlValue::Null),
                "TIME" => row
                    .try_get::<chrono::NaiveTime, _>(i)
                    .map(SqlValue::Time)
                    .unwrap_or(SqlValue::Null),
                "DATETIME" => row
                    .try_get::<chrono::NaiveDateTime, _>(i)
                    .map(SqlValue::DateTime)
                    .unwrap_or(SqlValue::Null),
                // TIMESTAMP decodes as UTC on the wire
                "TIMESTAMP" => row
                    .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                    .map(|v| SqlValue::DateTime(v.naive_utc()))
                    .unwrap_or(SqlValue::Null),

                "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
                    .try_get::<Vec<u8>, _>(i)
                    .map(SqlValue::Bytes)
                    .unwrap_or(SqlValue::Null),

                // CHAR, VARCHAR, TEXT, ENUM, SET, JSON, and anything else
                _ => row
                    .try_get::<String, _>(i)
                    .map(SqlValue::Text)
                    .unwrap_or(SqlValue::Null),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnDefinition;

    fn catalog() -> ColumnCatalog {
        ColumnCatalog::new(vec![
            ColumnDefinition {
                name: "id".to_string(),
                source_type: "int".to_string(),
                is_primary_key: true,
            },
            ColumnDefinition {
                name: "name".to_string(),
                source_type: "varchar".to_string(),
                is_primary_key: false,
            },
        ])
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("orders"), "`orders`");
        assert_eq!(quote_ident("weird`name"), "`weird``name`");
    }

    #[test]
    fn test_table_reference() {
        let d = MysqlDialect::default();
        assert_eq!(d.table_reference("shop", "orders"), "`shop`.`orders`");
    }

    #[test]
    fn test_select_columns_clause() {
        let d = MysqlDialect::default();
        assert_eq!(d.select_columns_clause(&catalog()), "`id`, `name`");
    }

    #[test]
    fn test_full_scan_query() {
        let d = MysqlDialect::default();
        let query = d.full_scan_query("`id`, `name`", "`shop`.`orders`", &["id".to_string()]);
        assert_eq!(
            query,
            "SELECT `id`, `name` FROM `shop`.`orders` ORDER BY `id`"
        );
    }

    #[test]
    fn test_key_window_query() {
        assert_eq!(
            key_window_query("`id`", "`shop`.`orders`", 2, 10),
            "SELECT `id` FROM `shop`.`orders` ORDER BY `id` LIMIT 20, 10"
        );
    }

    #[test]
    fn test_single_key_predicate() {
        let keys = vec!["id".to_string()];
        let rows = vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(7)]];
        assert_eq!(render_key_predicate(&keys, &rows), "`id` IN (1, 7)");
    }

    #[test]
    fn test_composite_key_predicate() {
        let keys = vec!["a".to_string(), "b".to_string()];
        let rows = vec![
            vec![SqlValue::Int(1), SqlValue::Text("x".to_string())],
            vec![SqlValue::Int(2), SqlValue::Text("y".to_string())],
        ];
        assert_eq!(
            render_key_predicate(&keys, &rows),
            "(`a`, `b`) IN ((1, 'x'), (2, 'y'))"
        );
    }

    #[test]
    fn test_binary_key_predicate_uses_hex_literal() {
        // BINARY(16) keys must round-trip through the membership filter,
        // which rules out backslash escapes MySQL does not recognize.
        let keys = vec!["id".to_string()];
        let rows = vec![
            vec![SqlValue::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF])],
            vec![SqlValue::Bytes(vec![0x01])],
        ];
        assert_eq!(
            render_key_predicate(&keys, &rows),
            "`id` IN (0xDEADBEEF, 0x01)"
        );
    }

    #[test]
    fn test_composite_binary_key_predicate() {
        let keys = vec!["tenant".to_string(), "id".to_string()];
        let rows = vec![vec![SqlValue::Int(3), SqlValue::Bytes(vec![0xAB])]];
        assert_eq!(
            render_key_predicate(&keys, &rows),
            "(`tenant`, `id`) IN ((3, 0xAB))"
        );
    }
}
