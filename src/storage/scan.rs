//! Scan handles and open-scan accounting
//!
//! A scan pairs a source of row positions with a lease. Relation scans
//! snapshot their positions at open time; index scans pull positions from
//! the index one key at a time. Releasing a scan twice is harmless; dropping
//! an unreleased scan returns its lease.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::errors::{StorageError, StorageResult};
use super::row::{Row, RowPos};
use super::table::Table;

/// Counts open scans and enforces the configured ceiling
#[derive(Debug)]
pub struct ScanTracker {
    open: AtomicUsize,
    opened_total: AtomicU64,
    limit: usize,
}

impl ScanTracker {
    /// Creates a tracker allowing at most `limit` simultaneously open scans
    pub fn new(limit: usize) -> Self {
        Self {
            open: AtomicUsize::new(0),
            opened_total: AtomicU64::new(0),
            limit,
        }
    }

    /// Takes a lease, failing when the ceiling is reached
    pub fn acquire(self: &Arc<Self>) -> StorageResult<ScanLease> {
        self.open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n < self.limit {
                    Some(n + 1)
                } else {
                    None
                }
            })
            .map_err(|_| StorageError::scan_limit(self.limit))?;
        self.opened_total.fetch_add(1, Ordering::Relaxed);

        Ok(ScanLease {
            tracker: Arc::clone(self),
            returned: false,
        })
    }

    /// Number of scans currently open
    pub fn open_scans(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    /// Number of scans ever opened
    pub fn total_opened(&self) -> u64 {
        self.opened_total.load(Ordering::Relaxed)
    }

    /// Configured ceiling
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// One unit of open-scan capacity
#[derive(Debug)]
pub struct ScanLease {
    tracker: Arc<ScanTracker>,
    returned: bool,
}

impl ScanLease {
    fn give_back(&mut self) {
        if !self.returned {
            self.returned = true;
            self.tracker.open.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for ScanLease {
    fn drop(&mut self) {
        self.give_back();
    }
}

/// Produces the row positions of a scan on demand
pub(crate) trait PositionSource: fmt::Debug + Send {
    fn next_position(&mut self) -> Option<RowPos>;
}

#[derive(Debug)]
enum Positions {
    Snapshot { positions: Vec<RowPos>, next: usize },
    Stream(Box<dyn PositionSource>),
}

impl Positions {
    fn next_position(&mut self) -> Option<RowPos> {
        match self {
            Positions::Snapshot { positions, next } => {
                let pos = positions.get(*next).copied()?;
                *next += 1;
                Some(pos)
            }
            Positions::Stream(source) => source.next_position(),
        }
    }
}

/// An open scan over a relation's rows in a fixed order
#[derive(Debug)]
pub struct RowScan {
    table: Option<Arc<Table>>,
    positions: Positions,
    lease: Option<ScanLease>,
}

impl RowScan {
    /// A scan that yields nothing and holds no lease
    pub fn empty() -> Self {
        Self {
            table: None,
            positions: Positions::Snapshot {
                positions: Vec::new(),
                next: 0,
            },
            lease: None,
        }
    }

    pub(crate) fn new(table: Arc<Table>, positions: Vec<RowPos>, lease: ScanLease) -> Self {
        Self {
            table: Some(table),
            positions: Positions::Snapshot { positions, next: 0 },
            lease: Some(lease),
        }
    }

    /// A scan reading positions from `source` as rows are requested
    pub(crate) fn streaming(table: Arc<Table>, source: Box<dyn PositionSource>, lease: ScanLease) -> Self {
        Self {
            table: Some(table),
            positions: Positions::Stream(source),
            lease: Some(lease),
        }
    }

    /// Returns the next row, or `None` when the scan is exhausted or released
    pub fn next_row(&mut self) -> Option<Row> {
        let table = self.table.as_ref()?;
        self.lease.as_ref()?;

        while let Some(pos) = self.positions.next_position() {
            if let Some(row) = table.row(pos) {
                return Some(row);
            }
        }
        None
    }

    /// Returns the lease. Returns true if this call released it.
    pub fn release(&mut self) -> bool {
        match self.lease.take() {
            Some(mut lease) => {
                lease.give_back();
                true
            }
            None => false,
        }
    }

    /// Returns true while the scan holds a lease
    pub fn is_open(&self) -> bool {
        self.lease.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ColumnDef, TableId};
    use crate::types::{DataType, Value};

    #[test]
    fn test_tracker_limit() {
        let tracker = Arc::new(ScanTracker::new(2));
        let a = tracker.acquire().unwrap();
        let _b = tracker.acquire().unwrap();
        assert_eq!(tracker.open_scans(), 2);
        assert!(tracker.acquire().is_err());

        drop(a);
        assert_eq!(tracker.open_scans(), 1);
        assert!(tracker.acquire().is_ok());
        assert_eq!(tracker.total_opened(), 3);
    }

    #[test]
    fn test_empty_scan_holds_no_lease() {
        let mut scan = RowScan::empty();
        assert!(!scan.is_open());
        assert!(scan.next_row().is_none());
        assert!(!scan.release());
    }

    #[derive(Debug)]
    struct Countdown(RowPos);

    impl PositionSource for Countdown {
        fn next_position(&mut self) -> Option<RowPos> {
            self.0 = self.0.checked_sub(1)?;
            Some(self.0)
        }
    }

    #[test]
    fn test_streaming_scan_stops_on_release() {
        let table = Arc::new(Table::new(
            TableId(1),
            "PUBLIC",
            "T",
            vec![ColumnDef::new("A", DataType::Integer)],
            None,
            None,
        ));
        for n in 0..3 {
            table.insert(vec![Value::Integer(n)]).unwrap();
        }
        let tracker = Arc::new(ScanTracker::new(1));
        let lease = tracker.acquire().unwrap();
        let mut scan = RowScan::streaming(table, Box::new(Countdown(3)), lease);

        assert_eq!(scan.next_row().map(|r| r.pos()), Some(2));
        assert!(scan.release());
        assert!(scan.next_row().is_none());
        assert_eq!(tracker.open_scans(), 0);
    }
}
