//! Observability subsystem for keeldb
//!
//! - Structured logging (JSON)
//! - Atomic counters
//! - Scoped begin/complete tracing
//!
//! Observability is read-only: nothing here feeds back into execution.
//!
//! ```ignore
//! use keeldb::observability::{Logger, MetricsRegistry};
//!
//! Logger::info("CURSOR_OPENED", &[("ranges", "2")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_rows_emitted();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

#[cfg(test)]
pub(crate) use logger::capture_log;

/// Log a typed event if it meets `threshold`
pub fn log_event(threshold: Severity, event: Event, fields: &[(&str, &str)]) {
    let severity = event.severity();
    if severity >= threshold {
        Logger::log(severity, event.as_str(), fields);
    }
}
