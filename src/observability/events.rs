//! Observable events of the access-path executor

use std::fmt;

use super::logger::Severity;

/// Typed events emitted while cursors run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Cursor tree opened for a query
    CursorOpened,
    /// Storage scan acquired for one alternative
    ScanOpened,
    /// Storage scan handle returned
    ScanReleased,
    /// Always-false alternative skipped without touching storage
    AlternativeSkipped,
    /// Null-padded left-outer row emitted
    LeftOuterPadded,
    /// Right-outer anti-join pass begins
    RightOuterPassBegin,
    /// Join cursor exhausted
    JoinExhausted,
    /// Access path lost its index
    IndexInvalidated,
    /// Index removed from the catalog
    IndexDropped,
    /// Cursor aborted with an error
    CursorFailed,
    /// Query execution scope (suffix added by the scope)
    QueryExecution,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CursorOpened => "CURSOR_OPENED",
            Event::ScanOpened => "SCAN_OPENED",
            Event::ScanReleased => "SCAN_RELEASED",
            Event::AlternativeSkipped => "ALTERNATIVE_SKIPPED",
            Event::LeftOuterPadded => "LEFT_OUTER_PADDED",
            Event::RightOuterPassBegin => "RIGHT_OUTER_PASS_BEGIN",
            Event::JoinExhausted => "JOIN_EXHAUSTED",
            Event::IndexInvalidated => "INDEX_INVALIDATED",
            Event::IndexDropped => "INDEX_DROPPED",
            Event::CursorFailed => "CURSOR_FAILED",
            Event::QueryExecution => "QUERY_EXECUTION",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ScanOpened
            | Event::ScanReleased
            | Event::AlternativeSkipped
            | Event::LeftOuterPadded
            | Event::JoinExhausted => Severity::Trace,
            Event::CursorOpened | Event::RightOuterPassBegin | Event::QueryExecution => Severity::Info,
            Event::IndexInvalidated | Event::IndexDropped => Severity::Warn,
            Event::CursorFailed => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
