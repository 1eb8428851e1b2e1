//! Run counters for the conversion service.
//!
//! Counters are atomics; duration samples and the last completion time sit
//! behind mutexes. Snapshots are serializable for the CLI's JSON output.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// Maximum number of duration samples to keep in memory.
const MAX_DURATION_SAMPLES: usize = 512;

/// Conversion metrics collector.
#[derive(Debug, Default)]
pub struct ConversionMetrics {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    rejected_busy: AtomicU64,
    total_output_bytes: AtomicU64,
    duration_samples: Mutex<Vec<Duration>>,
    last_finished_at: Mutex<Option<DateTime<Utc>>>,
}

impl ConversionMetrics {
    /// Create a new empty metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run that acquired the single-flight permit.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run rejected because another was in flight.
    pub fn record_busy(&self) {
        self.rejected_busy.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful run with its duration and artifact size.
    pub fn record_success(&self, duration: Duration, output_bytes: u64) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_output_bytes
            .fetch_add(output_bytes, Ordering::Relaxed);
        self.add_duration_sample(duration);
        self.mark_finished();
    }

    /// Record a failed run, classified by its error.
    pub fn record_failure(&self, duration: Duration, error: &ConversionError) {
        match error {
            ConversionError::Cancelled => {
                self.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            ConversionError::Timeout { .. } => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.add_duration_sample(duration);
        self.mark_finished();
    }

    fn add_duration_sample(&self, duration: Duration) {
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() >= MAX_DURATION_SAMPLES {
                samples.remove(0);
            }
            samples.push(duration);
        }
    }

    fn mark_finished(&self) {
        if let Ok(mut last) = self.last_finished_at.lock() {
            *last = Some(Utc::now());
        }
    }

    /// Current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let durations = self
            .duration_samples
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        let last_finished_at = self.last_finished_at.lock().map(|l| *l).unwrap_or_default();

        MetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            rejected_busy: self.rejected_busy.load(Ordering::Relaxed),
            total_output_bytes: self.total_output_bytes.load(Ordering::Relaxed),
            last_duration_ms: durations.last().map(|d| d.as_millis() as u64),
            median_duration_ms: median(&durations).map(|d| d.as_millis() as u64),
            last_finished_at,
        }
    }
}

fn median(durations: &[Duration]) -> Option<Duration> {
    if durations.is_empty() {
        return None;
    }
    let mut sorted = durations.to_vec();
    sorted.sort();
    sorted.get(sorted.len() / 2).copied()
}

/// A point-in-time snapshot of conversion metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Runs that started.
    pub started: u64,
    /// Runs that delivered an artifact.
    pub succeeded: u64,
    /// Runs that failed, timeouts included.
    pub failed: u64,
    /// Runs killed by the timeout.
    pub timed_out: u64,
    /// Runs cancelled by the caller.
    pub cancelled: u64,
    /// Requests refused because a run was in flight.
    pub rejected_busy: u64,
    /// Total bytes delivered to destinations.
    pub total_output_bytes: u64,
    /// Duration of the most recent finished run.
    pub last_duration_ms: Option<u64>,
    /// Median duration over recent runs.
    pub median_duration_ms: Option<u64>,
    /// When the most recent run finished.
    pub last_finished_at: Option<DateTime<Utc>>,
}
