//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, unsatisfiable
    /// pagination precondition, unknown order-by column).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database query error.
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Target database query error.
    #[error("Target database error: {0}")]
    Target(#[from] clickhouse::error::Error),

    /// Connection failure with context about where it occurred.
    #[error("Connection failed: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Source table or columns not found.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Target schema preparation (DDL) failure.
    #[error("Target DDL failed: {0}")]
    Ddl(String),

    /// Bulk insert failed after exhausting all retry attempts.
    #[error("Bulk insert failed for batch {batch} after {attempts} attempts: {message}")]
    Insert {
        batch: i64,
        attempts: usize,
        message: String,
    },

    /// IO error (config file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred.
    pub fn connection(message: impl Into<String>, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) => 2,
            MigrateError::Schema(_) => 3,
            _ => 1,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\n\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
