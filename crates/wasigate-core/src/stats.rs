//! Runtime statistics snapshots.
//!
//! The executor tracks counters with atomics and exposes them as a
//! serializable [`RuntimeStats`] snapshot for logging and the CLI.

use serde::{Deserialize, Serialize};

/// Snapshot of executor metrics at a point in time.
///
/// # Examples
///
/// ```
/// use wasigate_core::stats::RuntimeStats;
///
/// let stats = RuntimeStats::new(10, 8, 1, 1, 1_500);
/// assert_eq!(stats.total_executions, 10);
/// assert!((stats.failure_rate().unwrap() - 0.2).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStats {
    /// Total module executions attempted.
    pub total_executions: u32,

    /// Executions served from the compiled-module cache.
    pub cache_hits: u32,

    /// Executions that failed at any stage.
    pub execution_failures: u32,

    /// Failures specifically during module compilation.
    pub compilation_failures: u32,

    /// Average execution time in microseconds.
    pub avg_execution_time_us: u64,
}

impl RuntimeStats {
    /// Creates a statistics snapshot.
    #[must_use]
    pub const fn new(
        total_executions: u32,
        cache_hits: u32,
        execution_failures: u32,
        compilation_failures: u32,
        avg_execution_time_us: u64,
    ) -> Self {
        Self {
            total_executions,
            cache_hits,
            execution_failures,
            compilation_failures,
            avg_execution_time_us,
        }
    }

    /// Fraction of executions served from the module cache, or `None`
    /// before any execution has run.
    #[must_use]
    pub fn cache_hit_rate(&self) -> Option<f64> {
        if self.total_executions == 0 {
            None
        } else {
            Some(f64::from(self.cache_hits) / f64::from(self.total_executions))
        }
    }

    /// Fraction of executions that failed, or `None` before any
    /// execution has run.
    #[must_use]
    pub fn failure_rate(&self) -> Option<f64> {
        if self.total_executions == 0 {
            None
        } else {
            Some(f64::from(self.execution_failures) / f64::from(self.total_executions))
        }
    }
}
