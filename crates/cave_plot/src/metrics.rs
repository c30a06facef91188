//! Engine-agnostic metrics for background task runs.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use cave_plot::metrics::{TaskMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // Managers record every run they observe:
//! let metrics = manager.metrics();
//! println!("avg reduction {:.0}us", metrics.avg_run_timing_us());
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create a new rolling window with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Iterate over values (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    /// Get the most recent value.
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
    /// Compute the sum of all values.
    pub fn sum(&self) -> T {
        self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
    }
}

impl RollingWindow<u64> {
    /// Compute the average of all values.
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    /// Get min and max values.
    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = self.buffer.iter().min()?;
        let max = self.buffer.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(64)
    }
}

/// How a run ended, as far as metrics are concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    Stopped,
    Failed,
}

/// Per-manager run statistics, updated as task events are drained.
#[derive(Debug, Clone, Default)]
pub struct TaskMetrics {
    /// Rolling window of run durations in microseconds.
    pub run_timings: RollingWindow<u64>,
    /// Duration of the most recent run in microseconds.
    pub last_run_us: u64,

    pub finished_runs: u64,
    pub stopped_runs: u64,
    pub failed_runs: u64,
}

impl TaskMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset timings. Run counters are cumulative and kept.
    pub fn reset(&mut self) {
        self.run_timings.clear();
        self.last_run_us = 0;
    }

    /// Record one ended run. Stopped runs are counted but not timed.
    pub fn record_run(&mut self, outcome: RunOutcome, elapsed: Option<Duration>) {
        if !is_enabled() {
            return;
        }

        match outcome {
            RunOutcome::Finished => self.finished_runs += 1,
            RunOutcome::Stopped => {
                self.stopped_runs += 1;
                return;
            }
            RunOutcome::Failed => self.failed_runs += 1,
        }

        if let Some(elapsed) = elapsed {
            let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
            self.run_timings.push(us);
            self.last_run_us = us;
        }
    }

    pub fn total_runs(&self) -> u64 {
        self.finished_runs + self.stopped_runs + self.failed_runs
    }

    /// Get average run timing in microseconds.
    pub fn avg_run_timing_us(&self) -> f64 {
        self.run_timings.average()
    }
}
