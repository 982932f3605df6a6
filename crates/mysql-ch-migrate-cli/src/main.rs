//! mysql-ch-migrate CLI - Bulk MySQL to ClickHouse table migration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mysql_ch_migrate::{
    ClickHouseSink, Config, MigrateError, MigrationEngine, MysqlDialect, RunMode,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mysql-ch-migrate")]
#[command(about = "Bulk MySQL to ClickHouse table migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override rows per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Override worker count
    #[arg(long)]
    threads: Option<usize>,

    /// Override execution mode: sequential or parallel
    #[arg(long)]
    mode: Option<String>,

    /// Override sort columns (comma-separated)
    #[arg(long)]
    order_by: Option<String>,

    /// Drop the target table before creating it
    #[arg(long)]
    drop: bool,

    /// Lowercase column names in the target table
    #[arg(long)]
    lowercase: bool,

    /// Log every generated SQL statement at debug level
    #[arg(long)]
    trace: bool,

    /// Output the final report as JSON to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    apply_overrides(&mut config, &cli)?;
    config.validate()?;

    info!(
        source = %format!("{}.{}", config.source.database, config.source.table),
        target = %format!("{}.{}", config.target.database, config.target.table),
        mode = ?config.migration.mode,
        "starting migration"
    );

    let sink = ClickHouseSink::connect(&config.target).await?;
    let dialect = MysqlDialect::new(config.migration.trace);
    let engine = MigrationEngine::new(dialect, sink, config);
    let report = engine.run().await?;

    if cli.output_json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| MigrateError::Config(e.to_string()))?;
        println!("{}", json);
    } else {
        println!(
            "Migrated {} rows to target ({} counted) in {:.1}s ({:.0} rows/s)",
            report.rows_read,
            report.target_rows,
            report.duration_seconds,
            report.rows_per_second
        );
        if !report.failed_batches.is_empty() {
            eprintln!(
                "WARNING: {} batches ({} rows) failed after retries: {:?}",
                report.failed_batches.len(),
                report.failed_rows,
                report.failed_batches
            );
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<(), MigrateError> {
    if let Some(batch_size) = cli.batch_size {
        config.migration.batch_size = batch_size;
    }
    if let Some(threads) = cli.threads {
        config.migration.threads = threads;
    }
    if let Some(mode) = &cli.mode {
        config.migration.mode = match mode.to_lowercase().as_str() {
            "sequential" => RunMode::Sequential,
            "parallel" => RunMode::Parallel,
            other => {
                return Err(MigrateError::Config(format!(
                    "unknown mode '{}'; expected sequential or parallel",
                    other
                )))
            }
        };
    }
    if let Some(order_by) = &cli.order_by {
        config.migration.order_by = order_by
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if cli.drop {
        config.migration.drop_target = true;
    }
    if cli.lowercase {
        config.migration.lowercase = true;
    }
    if cli.trace {
        config.migration.trace = true;
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
