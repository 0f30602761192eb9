//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` on exit
//! - Logs `{name}_INCOMPLETE` if dropped without either

use std::cell::Cell;
use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs start and finish events at or above a threshold
///
/// ```ignore
/// let scope = ObservationScope::new("QUERY_EXECUTION", Severity::Info);
/// // ... do work ...
/// scope.complete_with_fields(&[("rows", "3")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    threshold: Severity,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope. Logs `{name}_BEGIN` at INFO.
    pub fn new(name: &'a str, threshold: Severity) -> Self {
        Self::with_fields(name, &[], threshold)
    }

    /// Create a new observation scope carrying fields on every line
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)], threshold: Severity) -> Self {
        let scope = Self {
            name,
            threshold,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        };
        scope.emit(Severity::Info, "BEGIN", &[]);
        scope
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        self.emit(Severity::Info, "COMPLETE", extra_fields);
    }

    /// Mark the scope as failed. `fatal` selects FATAL over ERROR.
    pub fn fail(self, reason: &str, fatal: bool) {
        self.completed.set(true);
        let severity = if fatal { Severity::Fatal } else { Severity::Error };
        self.emit(severity, "FAILED", &[("reason", reason)]);
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    fn emit(&self, severity: Severity, suffix: &str, extra: &[(&str, &str)]) {
        if severity < self.threshold {
            return;
        }
        let event = format!("{}_{}", self.name, suffix);
        let elapsed = self.started.elapsed().as_micros().to_string();

        let mut fields: Vec<(&str, &str)> = self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend(extra.iter().copied());
        if suffix != "BEGIN" {
            fields.push(("elapsed_us", elapsed.as_str()));
        }
        Logger::log(severity, &event, &fields);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            self.emit(Severity::Warn, "INCOMPLETE", &[("reason", "scope dropped without completion")]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_complete() {
        let scope = ObservationScope::new("TEST", Severity::Fatal);
        assert!(!scope.is_completed());
        scope.complete();
    }

    #[test]
    fn test_scope_with_fields() {
        let scope = ObservationScope::with_fields("TEST", &[("ranges", "2")], Severity::Fatal);
        scope.complete_with_fields(&[("rows", "4")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new("TEST", Severity::Fatal);
        scope.fail("evaluation failed", false);
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new("TEST", Severity::Fatal);
        drop(scope);
    }
}
