//! Batch-wide statistics shared by all workers

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

const MEGABYTE: f64 = 1024.0 * 1024.0;

/// Aggregate counters for one run
///
/// `processed`, `input_bytes` and `output_bytes` cover resized files only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub discovered: usize,
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed: Duration,
}

impl Statistics {
    /// Bytes saved; negative when outputs grew
    pub fn saved_bytes(&self) -> i128 {
        i128::from(self.input_bytes) - i128::from(self.output_bytes)
    }

    /// Savings as a percentage of the input, 0 when nothing was processed
    pub fn reduction_percent(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        self.saved_bytes() as f64 / self.input_bytes as f64 * 100.0
    }

    pub fn input_mb(&self) -> f64 {
        self.input_bytes as f64 / MEGABYTE
    }

    pub fn output_mb(&self) -> f64 {
        self.output_bytes as f64 / MEGABYTE
    }

    pub fn saved_mb(&self) -> f64 {
        self.saved_bytes() as f64 / MEGABYTE
    }

    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.is_zero() {
            return 0.0;
        }
        self.processed as f64 / self.elapsed.as_secs_f64()
    }
}

/// Mutex-guarded accumulator updated by worker tasks
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<Statistics>,
}

impl StatsAggregator {
    pub fn new(discovered: usize) -> Self {
        Self {
            inner: Mutex::new(Statistics {
                discovered,
                ..Statistics::default()
            }),
        }
    }

    // A panic elsewhere never leaves the counters half-updated, so a
    // poisoned lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, Statistics> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold in one resized file
    pub fn record(&self, input_bytes: u64, output_bytes: u64) {
        let mut stats = self.lock();
        stats.processed += 1;
        stats.input_bytes += input_bytes;
        stats.output_bytes += output_bytes;
    }

    pub fn record_skipped(&self) {
        self.lock().skipped += 1;
    }

    pub fn record_failed(&self) {
        self.lock().failed += 1;
    }

    pub fn record_cancelled(&self) {
        self.lock().cancelled += 1;
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> Statistics {
        self.lock().clone()
    }
}
