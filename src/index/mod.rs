//! Index subsystem for keeldb
//!
//! Composite in-memory indexes maintained on insert.
//!
//! # Design Principles
//!
//! - Deterministic: BTreeMap iteration order, sorted row positions
//! - Positioned scans walk the tree lazily, one key per step
//! - Access paths hold an `IndexRef`, resolved through the registry at scan open

mod btree;
mod comparator;
mod errors;
mod registry;

pub use btree::{IndexKey, IndexTree, KeyScan};
pub use comparator::Comparator;
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use registry::{Index, IndexId, IndexRef, IndexRegistry};
