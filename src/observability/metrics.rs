//! Metrics registry for keeldb
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

/// Executor counters.
///
/// Relaxed ordering throughout; values are exact once execution quiesces.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    scans_opened: AtomicU64,
    scans_released: AtomicU64,
    rows_emitted: AtomicU64,
    rows_rejected: AtomicU64,
    rows_excluded: AtomicU64,
    left_outer_padded: AtomicU64,
    right_outer_rows: AtomicU64,
    alternatives_skipped: AtomicU64,
    evaluation_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_scans_opened(&self) {
        self.scans_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scans_released(&self) {
        self.scans_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Row passed every predicate and was returned by a range cursor
    pub fn increment_rows_emitted(&self) {
        self.rows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Row failed a join or where residual
    pub fn increment_rows_rejected(&self) {
        self.rows_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Row already produced by an earlier OR alternative
    pub fn increment_rows_excluded(&self) {
        self.rows_excluded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_left_outer_padded(&self) {
        self.left_outer_padded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_right_outer_rows(&self) {
        self.right_outer_rows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_alternatives_skipped(&self) {
        self.alternatives_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_evaluation_failures(&self) {
        self.evaluation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"scans_opened":{},"scans_released":{},"rows_emitted":{},"rows_rejected":{},"rows_excluded":{},"left_outer_padded":{},"right_outer_rows":{},"alternatives_skipped":{},"evaluation_failures":{}}}"#,
            s.scans_opened,
            s.scans_released,
            s.rows_emitted,
            s.rows_rejected,
            s.rows_excluded,
            s.left_outer_padded,
            s.right_outer_rows,
            s.alternatives_skipped,
            s.evaluation_failures,
        )
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scans_opened: self.scans_opened.load(Ordering::Relaxed),
            scans_released: self.scans_released.load(Ordering::Relaxed),
            rows_emitted: self.rows_emitted.load(Ordering::Relaxed),
            rows_rejected: self.rows_rejected.load(Ordering::Relaxed),
            rows_excluded: self.rows_excluded.load(Ordering::Relaxed),
            left_outer_padded: self.left_outer_padded.load(Ordering::Relaxed),
            right_outer_rows: self.right_outer_rows.load(Ordering::Relaxed),
            alternatives_skipped: self.alternatives_skipped.load(Ordering::Relaxed),
            evaluation_failures: self.evaluation_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub scans_opened: u64,
    pub scans_released: u64,
    pub rows_emitted: u64,
    pub rows_rejected: u64,
    pub rows_excluded: u64,
    pub left_outer_padded: u64,
    pub right_outer_rows: u64,
    pub alternatives_skipped: u64,
    pub evaluation_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.increment_scans_opened();
        registry.increment_scans_opened();
        registry.increment_scans_released();
        registry.increment_rows_emitted();
        registry.increment_left_outer_padded();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.scans_opened, 2);
        assert_eq!(snapshot.scans_released, 1);
        assert_eq!(snapshot.rows_emitted, 1);
        assert_eq!(snapshot.left_outer_padded, 1);
        assert_eq!(snapshot.right_outer_rows, 0);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.increment_rows_excluded();
        registry.increment_alternatives_skipped();

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["rows_excluded"], 1);
        assert_eq!(parsed["alternatives_skipped"], 1);
        assert_eq!(parsed["scans_opened"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        reg.increment_rows_emitted();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.snapshot().rows_emitted, 800);
    }
}
