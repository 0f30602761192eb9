//! Storage subsystem for keeldb
//!
//! Relations hold their rows in an in-memory row store. Every scan over a
//! relation or one of its indexes holds a lease from the catalog's
//! [`ScanTracker`]; the lease is returned when the scan is released or
//! dropped.
//!
//! # Invariants
//!
//! - Row positions are assigned in insertion order and never reused
//! - A row identifier is unique across all relations of a catalog
//! - Relation scans snapshot their row positions at open time
//! - Index scans read their index one key at a time while rows are requested

mod errors;
mod row;
mod scan;
mod table;

pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use row::{Row, RowId, RowPos};
pub(crate) use scan::PositionSource;
pub use scan::{RowScan, ScanLease, ScanTracker};
pub use table::{ColumnDef, DerivedSource, Table, TableId};
