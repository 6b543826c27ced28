// Run metrics module
//
// Lightweight counters for check and fix activity, logged on shutdown

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for check and fix activity.
///
/// Uses atomic operations so the runner can record through a shared
/// reference. Logged once at shutdown with [`Metrics::log_summary`].
#[derive(Debug)]
pub struct Metrics {
    /// Check passes that completed
    pub checks_run: AtomicUsize,

    /// Defective objects reported across all check passes
    pub defects_found: AtomicUsize,

    /// Check passes aborted by a configuration error
    pub check_failures: AtomicUsize,

    /// Fix passes that completed
    pub fixes_applied: AtomicUsize,

    /// Fix passes that returned an error
    pub fix_failures: AtomicUsize,

    /// Total time spent inside check passes, in microseconds
    pub total_check_time_us: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            checks_run: AtomicUsize::new(0),
            defects_found: AtomicUsize::new(0),
            check_failures: AtomicUsize::new(0),
            fixes_applied: AtomicUsize::new(0),
            fix_failures: AtomicUsize::new(0),
            total_check_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed check pass and how many objects it flagged
    pub fn record_check(&self, defects: usize, duration: Duration) {
        self.checks_run.fetch_add(1, Ordering::Relaxed);
        self.defects_found.fetch_add(defects, Ordering::Relaxed);
        self.total_check_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_check_failure(&self) {
        self.check_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fix(&self) {
        self.fixes_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fix_failure(&self) {
        self.fix_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time per check pass in milliseconds
    pub fn avg_check_time_ms(&self) -> f64 {
        let total = self.total_check_time_us.load(Ordering::Relaxed);
        let count = self.checks_run.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / 1000.0 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Sanity Check Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Checks: {} run, {} failed, {} defective objects",
            self.checks_run.load(Ordering::Relaxed),
            self.check_failures.load(Ordering::Relaxed),
            self.defects_found.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Total check time: {:.2}ms (avg: {:.3}ms per check)",
            self.total_check_time_us.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_check_time_ms()
        );
        tracing::info!(
            "Fixes: {} applied, {} failed",
            self.fixes_applied.load(Ordering::Relaxed),
            self.fix_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
