//! Cumulative progress reporting shared across workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::info;

/// Thread-safe row counter that logs throughput whenever the cumulative
/// count crosses a reporting-interval boundary.
pub struct ProgressTracker {
    rows: AtomicU64,
    interval: u64,
    started: Instant,
    table: String,
}

impl ProgressTracker {
    pub fn new(table: &str, interval: usize) -> Self {
        Self {
            rows: AtomicU64::new(0),
            interval: interval.max(1) as u64,
            started: Instant::now(),
            table: table.to_string(),
        }
    }

    /// Record `count` transferred rows, logging if the total crossed an
    /// interval boundary.
    pub fn add(&self, count: usize) {
        if count == 0 {
            return;
        }
        let previous = self.rows.fetch_add(count as u64, Ordering::Relaxed);
        let total = previous + count as u64;
        if previous / self.interval != total / self.interval {
            let elapsed = self.started.elapsed().as_secs_f64();
            if elapsed >= 1.0 {
                let rate = total as f64 / elapsed;
                info!(
                    table = %self.table,
                    rows = total,
                    rows_per_sec = format!("{:.0}", rate),
                    "progress"
                );
            } else {
                info!(table = %self.table, rows = total, "progress");
            }
        }
    }

    /// Total rows recorded so far.
    pub fn total(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }

    /// Seconds since the tracker was created.
    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
