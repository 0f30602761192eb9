//! BTreeMap-based composite index trees
//!
//! Keys are tuples of column values ordered lexicographically, NULL lowest.
//! Each key maps to the row positions holding it, sorted ascending.

use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;

use crate::storage::RowPos;
use crate::types::Value;

use super::comparator::Comparator;

/// Index key: the indexed column values of one row, in index column order.
///
/// A shorter key sorts before every key it is a prefix of, so a bound tuple
/// can be used directly as a range endpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexKey(Vec<Value>);

impl IndexKey {
    pub fn new(values: Vec<Value>) -> Self {
        IndexKey(values)
    }

    /// Builds the key for a row from the indexed column positions
    pub fn from_row(row: &[Value], columns: &[usize]) -> Self {
        IndexKey(
            columns
                .iter()
                .map(|&c| row.get(c).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Compares the first `len` values of this key with `bound[..len]`
    pub fn cmp_prefix(&self, bound: &[Value], len: usize) -> Ordering {
        let len = len.min(bound.len());
        for i in 0..len {
            let ord = match self.0.get(i) {
                Some(v) => v.cmp(&bound[i]),
                None => Ordering::Less,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn same_prefix(&self, other: &IndexKey, len: usize) -> bool {
        self.cmp_prefix(&other.0, len) == Ordering::Equal
    }
}

/// A composite index using BTreeMap for deterministic ordering.
#[derive(Debug, Default)]
pub struct IndexTree {
    tree: BTreeMap<IndexKey, Vec<RowPos>>,
}

impl IndexTree {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a row position for a key.
    ///
    /// Maintains sorted ascending order.
    pub fn insert(&mut self, key: IndexKey, pos: RowPos) {
        let positions = self.tree.entry(key).or_default();
        if let Err(at) = positions.binary_search(&pos) {
            positions.insert(at, pos);
        }
    }

    /// Remove a row position for a key.
    ///
    /// If the key has no more positions, removes the key entirely.
    pub fn remove(&mut self, key: &IndexKey, pos: RowPos) {
        if let Some(positions) = self.tree.get_mut(key) {
            if let Ok(at) = positions.binary_search(&pos) {
                positions.remove(at);
            }
            if positions.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Lookup all positions for an exact key match
    pub fn lookup_eq(&self, key: &IndexKey) -> Vec<RowPos> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    /// Every position in key order, or reverse key order
    pub fn scan_all(&self, reversed: bool) -> Vec<RowPos> {
        self.drain(KeyScan::unbounded(reversed))
    }

    /// Positions from the first key satisfying `comparator` against
    /// `bound[..prefix_len]` to the end of the index in scan direction.
    ///
    /// `distinct_len > 0` keeps only the first row for each distinct value
    /// of the leading `distinct_len` key columns.
    pub fn scan_from(
        &self,
        bound: &[Value],
        prefix_len: usize,
        distinct_len: usize,
        comparator: Comparator,
        reversed: bool,
    ) -> Vec<RowPos> {
        self.drain(KeyScan::new(bound, prefix_len, distinct_len, comparator, reversed))
    }

    /// Next position of `scan`, reading one key at a time.
    ///
    /// Keys are located relative to the last key the scan emitted, so rows
    /// inserted or removed between calls are seen as the tree is then.
    pub fn advance(&self, scan: &mut KeyScan) -> Option<RowPos> {
        loop {
            if let Some(pos) = scan.pending.pop_front() {
                return Some(pos);
            }
            if scan.exhausted {
                return None;
            }

            let next = match &scan.last {
                None => self.first_key(scan),
                Some(last) => self.key_after(scan, last),
            };
            let Some((key, positions)) = next else {
                scan.exhausted = true;
                return None;
            };

            if scan.distinct_len > 0 {
                let first = if scan.reversed { positions.last() } else { positions.first() };
                scan.pending.extend(first.copied());
            } else if scan.reversed {
                scan.pending.extend(positions.iter().rev());
            } else {
                scan.pending.extend(positions.iter());
            }
            scan.last = Some(key.clone());
        }
    }

    fn first_key(&self, scan: &KeyScan) -> Option<(&IndexKey, &Vec<RowPos>)> {
        let start = &scan.start;
        let len = start.0.len();

        if !scan.reversed {
            match scan.comparator {
                Comparator::Greater | Comparator::NotNull => self
                    .tree
                    .range((Bound::Included(start), Bound::Unbounded))
                    .find(|(k, _)| k.cmp_prefix(&start.0, len) != Ordering::Equal),
                Comparator::Equal | Comparator::IsNull | Comparator::GreaterEqual => {
                    self.tree.range((Bound::Included(start), Bound::Unbounded)).next()
                }
                // reversed-only comparators leave a forward scan unrestricted
                Comparator::Smaller | Comparator::SmallerEqual | Comparator::Max => self.tree.iter().next(),
            }
        } else {
            match scan.comparator {
                Comparator::Smaller => self
                    .tree
                    .range((Bound::Unbounded, Bound::Excluded(start)))
                    .next_back(),
                Comparator::SmallerEqual | Comparator::Equal | Comparator::IsNull => self
                    .tree
                    .iter()
                    .rev()
                    .find(|(k, _)| k.cmp_prefix(&start.0, len) != Ordering::Greater),
                Comparator::Max => {
                    let eq_len = len.saturating_sub(1);
                    self.tree
                        .iter()
                        .rev()
                        .find(|(k, _)| k.cmp_prefix(&start.0, eq_len) != Ordering::Greater)
                }
                Comparator::Greater | Comparator::GreaterEqual | Comparator::NotNull => {
                    self.tree.iter().next_back()
                }
            }
        }
    }

    fn key_after(&self, scan: &KeyScan, last: &IndexKey) -> Option<(&IndexKey, &Vec<RowPos>)> {
        let distinct = scan.distinct_len;
        let fresh = |k: &IndexKey| distinct == 0 || !k.same_prefix(last, distinct);

        if scan.reversed {
            self.tree
                .range((Bound::Unbounded, Bound::Excluded(last)))
                .rev()
                .find(|(k, _)| fresh(k))
        } else {
            self.tree
                .range((Bound::Excluded(last), Bound::Unbounded))
                .find(|(k, _)| fresh(k))
        }
    }

    fn drain(&self, mut scan: KeyScan) -> Vec<RowPos> {
        std::iter::from_fn(|| self.advance(&mut scan)).collect()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }
}

/// Position of a lazy walk over an [`IndexTree`].
///
/// Holds the start key and the last key emitted; the tree itself is only
/// borrowed for the duration of each [`IndexTree::advance`] call.
#[derive(Debug, Clone)]
pub struct KeyScan {
    start: IndexKey,
    comparator: Comparator,
    reversed: bool,
    distinct_len: usize,
    last: Option<IndexKey>,
    pending: VecDeque<RowPos>,
    exhausted: bool,
}

impl KeyScan {
    /// A walk positioned by `bound[..prefix_len]` under `comparator`
    pub fn new(
        bound: &[Value],
        prefix_len: usize,
        distinct_len: usize,
        comparator: Comparator,
        reversed: bool,
    ) -> Self {
        let prefix_len = prefix_len.min(bound.len());
        Self {
            start: IndexKey(bound[..prefix_len].to_vec()),
            comparator,
            reversed,
            distinct_len,
            last: None,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// A walk over every key
    pub fn unbounded(reversed: bool) -> Self {
        Self::new(&[], 0, 0, Comparator::GreaterEqual, reversed)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pending.is_empty()
    }
}
