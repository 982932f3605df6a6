//! Migration engine: strategy selection, target preparation, and the
//! sequential and parallel copy loops.
//!
//! The engine is generic over the source [`Dialect`] and the [`TargetSink`],
//! which keeps the copy loops testable against in-memory mocks.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, RunMode};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};
use crate::target::{self, TargetSink};

pub mod cursor;
pub mod progress;
pub mod retry;

pub use cursor::BatchCursor;
pub use progress::ProgressTracker;
pub use retry::RetryingInserter;

/// Channel depth for the sequential streaming pipeline, in chunks.
const STREAM_CHANNEL_DEPTH: usize = 4;

/// Outcome of a completed run. Batches that exhausted their insert retries
/// are listed here rather than aborting the run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Source table name.
    pub table: String,

    /// Rows read from the source.
    pub rows_read: u64,

    /// Rows counted in the target table after the run.
    pub target_rows: u64,

    /// Batch indices whose inserts exhausted all retries.
    pub failed_batches: Vec<i64>,

    /// Rows lost to failed batches.
    pub failed_rows: u64,

    /// Wall-clock duration of the copy phase.
    pub duration_seconds: f64,

    /// Read throughput over the copy phase.
    pub rows_per_second: f64,
}

impl MigrationReport {
    /// True when every source row made it into the target.
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty() && self.rows_read == self.target_rows
    }
}

/// A batch whose insert exhausted its retries.
#[derive(Debug, Clone, Copy)]
struct FailedBatch {
    index: i64,
    rows: usize,
}

/// Single-table migration engine.
pub struct MigrationEngine<D, S> {
    dialect: Arc<D>,
    sink: Arc<S>,
    config: Config,
}

/// The resolved execution plan for a run.
struct Plan {
    /// Columns used for page membership in parallel mode.
    primary_keys: Vec<String>,

    /// Columns the target sorts by, and the sequential scan orders by.
    sort_key: Vec<String>,

    mode: RunMode,
    threads: usize,
}

impl<D, S> MigrationEngine<D, S>
where
    D: Dialect + 'static,
    S: TargetSink + 'static,
{
    pub fn new(dialect: D, sink: S, config: Config) -> Self {
        Self {
            dialect: Arc::new(dialect),
            sink: Arc::new(sink),
            config,
        }
    }

    /// Run the migration end to end: discover the schema, prepare the
    /// target, copy the rows, and verify the target count.
    pub async fn run(&self) -> Result<MigrationReport> {
        let source = &self.config.source;

        let mut conn = self.dialect.connect(source).await?;
        let catalog = self
            .dialect
            .get_columns(&mut conn, &source.database, &source.table)
            .await?;

        info!(
            table = %source.table,
            columns = catalog.len(),
            primary_key_columns = catalog.primary_keys().len(),
            "discovered source schema"
        );

        let plan = self.resolve_plan(&catalog)?;
        self.prepare_target(&catalog, &plan).await?;

        let select_clause = self.dialect.select_columns_clause(&catalog);
        let table_ref = self
            .dialect
            .table_reference(&source.database, &source.table);
        let template = target::build_insert_template(
            &self.config.target.database,
            &self.config.target.table,
            &catalog,
            self.config.migration.lowercase,
        );

        let progress = Arc::new(ProgressTracker::new(
            &source.table,
            self.config.migration.batch_size,
        ));
        let failures: Arc<Mutex<Vec<FailedBatch>>> = Arc::new(Mutex::new(Vec::new()));

        match plan.mode {
            RunMode::Sequential => {
                self.run_sequential(conn, &plan, &select_clause, &table_ref, &template, &progress, &failures)
                    .await?;
            }
            RunMode::Parallel => {
                drop(conn);
                self.run_parallel(&plan, &select_clause, &table_ref, &template, &progress, &failures)
                    .await?;
            }
        }

        let duration = progress.elapsed_seconds();
        let rows_read = progress.total();
        let target_ref = target::table_reference(
            &self.config.target.database,
            &self.config.target.table,
        );
        let target_rows = self.sink.count(&target_ref).await?;

        let failed = failures.lock().unwrap_or_else(|e| e.into_inner());
        let failed_batches: Vec<i64> = failed.iter().map(|f| f.index).collect();
        let failed_rows: u64 = failed.iter().map(|f| f.rows as u64).sum();
        drop(failed);

        let report = MigrationReport {
            table: source.table.clone(),
            rows_read,
            target_rows,
            failed_batches,
            failed_rows,
            duration_seconds: duration,
            rows_per_second: if duration > 0.0 {
                rows_read as f64 / duration
            } else {
                0.0
            },
        };

        if report.is_complete() {
            info!(
                table = %report.table,
                rows = report.rows_read,
                seconds = format!("{:.1}", report.duration_seconds),
                "migration complete"
            );
        } else {
            warn!(
                table = %report.table,
                rows_read = report.rows_read,
                target_rows = report.target_rows,
                failed_batches = report.failed_batches.len(),
                failed_rows = report.failed_rows,
                "migration finished with losses"
            );
        }

        Ok(report)
    }

    /// Resolve sort key, pagination keys, mode, and worker count against
    /// the live catalog. Fails before any target DDL runs.
    fn resolve_plan(&self, catalog: &crate::catalog::ColumnCatalog) -> Result<Plan> {
        let migration = &self.config.migration;
        let primary_keys = catalog.primary_keys();

        for column in &migration.order_by {
            if !catalog.contains_ignore_case(column) {
                return Err(MigrateError::Config(format!(
                    "order_by column '{}' does not exist in {}.{}",
                    column, self.config.source.database, self.config.source.table
                )));
            }
        }

        let sort_key = if !migration.order_by.is_empty() {
            migration.order_by.clone()
        } else if !primary_keys.is_empty() {
            primary_keys.clone()
        } else {
            return Err(MigrateError::Config(format!(
                "table {}.{} has no primary key; set migration.order_by",
                self.config.source.database, self.config.source.table
            )));
        };

        // Page membership needs a unique tuple, so only the primary key
        // qualifies. Without one the copy must be a single ordered scan.
        let mut mode = migration.mode;
        let mut threads = migration.threads;
        if primary_keys.is_empty() {
            if mode == RunMode::Parallel {
                warn!(
                    table = %self.config.source.table,
                    "no primary key; falling back to sequential mode"
                );
            }
            mode = RunMode::Sequential;
            threads = 1;
        }
        if mode == RunMode::Sequential {
            threads = 1;
        }

        Ok(Plan {
            primary_keys,
            sort_key,
            mode,
            threads,
        })
    }

    /// Create the target database and table, dropping the table first when
    /// configured. DDL failures are fatal.
    async fn prepare_target(
        &self,
        catalog: &crate::catalog::ColumnCatalog,
        plan: &Plan,
    ) -> Result<()> {
        let target = &self.config.target;

        self.sink
            .execute(&target::build_create_database(&target.database))
            .await?;

        if self.config.migration.drop_target {
            self.sink
                .execute(&target::build_drop_table(&target.database, &target.table))
                .await?;
        }

        let ddl = target::build_create_table(
            self.dialect.as_ref(),
            &target.database,
            &target.table,
            catalog,
            &plan.sort_key,
            self.config.migration.lowercase,
        );
        if self.config.migration.trace {
            debug!(sql = %ddl, "create table");
        }
        self.sink.execute(&ddl).await?;

        info!(
            database = %target.database,
            table = %target.table,
            "target table ready"
        );

        Ok(())
    }

    /// Single ordered full scan streamed through a bounded channel, with
    /// the insert side consuming chunk by chunk.
    #[allow(clippy::too_many_arguments)]
    async fn run_sequential(
        &self,
        conn: D::Conn,
        plan: &Plan,
        select_clause: &str,
        table_ref: &str,
        template: &str,
        progress: &Arc<ProgressTracker>,
        failures: &Arc<Mutex<Vec<FailedBatch>>>,
    ) -> Result<()> {
        let query = self
            .dialect
            .full_scan_query(select_clause, table_ref, &plan.sort_key);
        if self.config.migration.trace {
            debug!(sql = %query, "full scan");
        }

        let (tx, mut rx) = mpsc::channel(STREAM_CHANNEL_DEPTH);
        let dialect = Arc::clone(&self.dialect);
        let chunk_size = self.config.migration.batch_size;
        let reader = tokio::spawn(async move {
            dialect.stream_full_scan(conn, query, chunk_size, tx).await
        });

        let inserter = RetryingInserter::new(self.sink.as_ref(), template);
        let mut batch_index: i64 = 0;
        let mut insert_error = None;

        while let Some(rows) = rx.recv().await {
            progress.add(rows.len());
            match inserter.insert(batch_index, &rows).await {
                Ok(()) => {}
                Err(MigrateError::Insert { batch, .. }) => {
                    failures
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(FailedBatch {
                            index: batch,
                            rows: rows.len(),
                        });
                }
                Err(e) => {
                    // Drop the receiver so the reader stops producing
                    insert_error = Some(e);
                    break;
                }
            }
            batch_index += 1;
        }
        drop(rx);

        let read_result = reader
            .await
            .map_err(|e| MigrateError::connection(e.to_string(), "source reader task"))?;

        if let Some(e) = insert_error {
            return Err(e);
        }
        read_result
    }

    /// Fixed pool of workers claiming batch indices from a shared cursor,
    /// each on its own source connection.
    #[allow(clippy::too_many_arguments)]
    async fn run_parallel(
        &self,
        plan: &Plan,
        select_clause: &str,
        table_ref: &str,
        template: &str,
        progress: &Arc<ProgressTracker>,
        failures: &Arc<Mutex<Vec<FailedBatch>>>,
    ) -> Result<()> {
        let cursor = Arc::new(BatchCursor::new());
        let primary_keys = Arc::new(plan.primary_keys.clone());

        info!(
            threads = plan.threads,
            batch_size = self.config.migration.batch_size,
            "starting parallel copy"
        );

        let mut handles = Vec::with_capacity(plan.threads);
        for worker_id in 0..plan.threads {
            let dialect = Arc::clone(&self.dialect);
            let sink = Arc::clone(&self.sink);
            let cursor = Arc::clone(&cursor);
            let progress = Arc::clone(progress);
            let failures = Arc::clone(failures);
            let primary_keys = Arc::clone(&primary_keys);
            let source = self.config.source.clone();
            let select_clause = select_clause.to_string();
            let table_ref = table_ref.to_string();
            let template = template.to_string();
            let batch_size = self.config.migration.batch_size;
            let trace = self.config.migration.trace;

            handles.push(tokio::spawn(async move {
                let mut conn = dialect.connect(&source).await?;
                let inserter = RetryingInserter::new(sink.as_ref(), &template);

                loop {
                    let batch_index = cursor.claim();
                    let page = dialect
                        .batch_query(
                            &mut conn,
                            &primary_keys,
                            &select_clause,
                            &table_ref,
                            batch_index,
                            batch_size,
                        )
                        .await?;

                    let Some(page) = page else {
                        debug!(worker = worker_id, batch = batch_index, "key space exhausted");
                        break;
                    };

                    if trace {
                        debug!(worker = worker_id, sql = %page.query, "batch fetch");
                    }

                    let rows = dialect.fetch_rows(&mut conn, &page.query).await?;
                    progress.add(rows.len());

                    match inserter.insert(batch_index, &rows).await {
                        Ok(()) => {}
                        Err(MigrateError::Insert { batch, .. }) => {
                            failures
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .push(FailedBatch {
                                    index: batch,
                                    rows: rows.len(),
                                });
                        }
                        Err(e) => return Err(e),
                    }

                    // A short page means the key space ended inside this batch
                    if page.rows_in_batch < batch_size {
                        break;
                    }
                }

                Ok::<(), MigrateError>(())
            }));
        }

        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "worker failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    error!(error = %e, "worker panicked");
                    if first_error.is_none() {
                        first_error =
                            Some(MigrateError::connection(e.to_string(), "worker task"));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
