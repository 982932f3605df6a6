//! Retrying wrapper around target inserts.

use std::time::Duration;

use tracing::warn;

use crate::error::{MigrateError, Result};
use crate::target::TargetSink;
use crate::value::Row;

/// Total attempts per batch, including the first.
const MAX_ATTEMPTS: usize = 5;

/// Delay between attempts.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Retries failed batch inserts a fixed number of times before giving up.
/// Exhaustion surfaces as [`MigrateError::Insert`] carrying the batch index
/// so the caller can record the loss instead of silently dropping rows.
pub struct RetryingInserter<'a, S: TargetSink> {
    sink: &'a S,
    template: &'a str,
}

impl<'a, S: TargetSink> RetryingInserter<'a, S> {
    pub fn new(sink: &'a S, template: &'a str) -> Self {
        Self { sink, template }
    }

    pub async fn insert(&self, batch_index: i64, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.sink.insert(self.template, rows).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        batch = batch_index,
                        attempt,
                        max_attempts = MAX_ATTEMPTS,
                        error = %e,
                        "batch insert failed"
                    );
                    last_error = e.to_string();
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(MigrateError::Insert {
            batch: batch_index,
            attempts: MAX_ATTEMPTS,
            message: last_error,
        })
    }
}
