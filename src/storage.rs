//! Storage collaborator contract.
//!
//! The estimator never persists anything itself. A hyperloglog column is stored as one
//! cell per `(row, column, register index)`, and the store resolves concurrent versions
//! of a cell with the reconciliation function registered for the column's type.
//!
//! Two kinds of cell mutation exist:
//! - [`CellMutation::Merge`] contributes a value and never hides anything.
//! - [`CellMutation::Reset`] is the tombstone-like clear marker: it shadows every version
//!   of the cell written strictly before its timestamp, then contributes its own value.
//!   `Reset(0)` is a plain clear.
//!
//! Consistency: reads observe whatever writes have completed and converge eventually.
//! There is no point-in-time snapshot across register cells.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tracing::trace;

use crate::error::Result;
use crate::reconcile::{last_write_wins, ReconcileFn};
use crate::types::TypeTag;

/// Mutation applied to a single register cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellMutation {
    Merge(u8),
    Reset(u8),
}

impl CellMutation {
    #[inline]
    pub fn value(self) -> u8 {
        match self {
            CellMutation::Merge(v) | CellMutation::Reset(v) => v,
        }
    }

    /// Whether this mutation hides older versions of the cell
    #[inline]
    pub fn shadows_older(self) -> bool {
        matches!(self, CellMutation::Reset(_))
    }
}

/// One register cell write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellWrite {
    pub index: u32,
    pub timestamp: u64,
    pub mutation: CellMutation,
}

/// Parameters shared by all cell writes of one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteParams {
    /// Write timestamp in microseconds
    pub timestamp: u64,
}

impl WriteParams {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }

    /// Parameters stamped with the current wall clock.
    pub fn now() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default();
        Self { timestamp }
    }
}

/// Cell-level storage operations a hyperloglog column needs.
pub trait CellStore: Send + Sync {
    /// Persist one register cell write.
    fn write_cell(&self, row: &[u8], column: &str, write: CellWrite) -> Result<()>;

    /// Persist the writes of one operation as a single round.
    fn write_cells(&self, row: &[u8], column: &str, writes: &[CellWrite]) -> Result<()> {
        for write in writes {
            self.write_cell(row, column, *write)?;
        }
        Ok(())
    }

    /// Live values of every register cell of `(row, column)`, keyed by register index.
    /// An index may carry several versions the store has not collapsed yet; absent
    /// indices are registers with value zero.
    fn read_cells(&self, row: &[u8], column: &str) -> Result<BTreeMap<u32, Vec<u8>>>;

    /// Declare the type of `column`, selecting the reconciler applied to its cells.
    fn declare_column(&self, column: &str, type_tag: TypeTag);

    /// Use `reconcile` for conflicting versions of cells of `type_tag` columns.
    fn register_reconciler(&self, type_tag: TypeTag, reconcile: ReconcileFn);
}

/// Versions of one cell.
#[derive(Clone, Debug, Default)]
struct CellVersions {
    /// Versions written strictly before this timestamp are shadowed
    cleared_before: u64,
    /// Live `(timestamp, value)` versions, none dominated by another
    live: Vec<(u64, u8)>,
}

impl CellVersions {
    fn apply(&mut self, write: &CellWrite, reconcile: ReconcileFn) {
        if write.timestamp < self.cleared_before {
            return;
        }
        if write.mutation.shadows_older() {
            self.cleared_before = write.timestamp;
            self.live.retain(|&(ts, _)| ts >= write.timestamp);
        }

        let (ts, value) = (write.timestamp, write.mutation.value());
        // `(t1, v1)` dominates `(t2, v2)` when it is at least as recent and wins reconciliation.
        // Dominated versions can never matter again, whatever reset arrives later.
        if self
            .live
            .iter()
            .any(|&(t, v)| t >= ts && reconcile(value, v) == v)
        {
            return;
        }
        let before = self.live.len();
        self.live
            .retain(|&(t, v)| !(ts >= t && reconcile(v, value) == value));
        if self.live.len() < before {
            trace!(
                collapsed = before - self.live.len(),
                index = write.index,
                "collapsed register cell versions"
            );
        }
        self.live.push((ts, value));
    }
}

type CellKey = (Vec<u8>, String);

/// In-memory [`CellStore`], safe to share between concurrent writers.
#[derive(Default)]
pub struct MemoryCellStore {
    cells: DashMap<CellKey, BTreeMap<u32, CellVersions>>,
    column_types: DashMap<String, TypeTag>,
    reconcilers: DashMap<TypeTag, ReconcileFn>,
}

impl MemoryCellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconciler for `column`, last-write-wins for untyped columns or unregistered types.
    fn reconciler_for(&self, column: &str) -> ReconcileFn {
        self.column_types
            .get(column)
            .and_then(|tag| self.reconcilers.get(tag.value()).map(|f| *f.value()))
            .unwrap_or(last_write_wins)
    }
}

impl CellStore for MemoryCellStore {
    fn write_cell(&self, row: &[u8], column: &str, write: CellWrite) -> Result<()> {
        self.write_cells(row, column, &[write])
    }

    fn write_cells(&self, row: &[u8], column: &str, writes: &[CellWrite]) -> Result<()> {
        let reconcile = self.reconciler_for(column);
        let mut cells = self
            .cells
            .entry((row.to_vec(), column.to_string()))
            .or_default();
        for write in writes {
            cells.entry(write.index).or_default().apply(write, reconcile);
        }
        Ok(())
    }

    fn read_cells(&self, row: &[u8], column: &str) -> Result<BTreeMap<u32, Vec<u8>>> {
        let Some(cells) = self.cells.get(&(row.to_vec(), column.to_string())) else {
            return Ok(BTreeMap::new());
        };
        Ok(cells
            .iter()
            .filter(|(_, versions)| !versions.live.is_empty())
            .map(|(&index, versions)| (index, versions.live.iter().map(|&(_, v)| v).collect()))
            .collect())
    }

    fn declare_column(&self, column: &str, type_tag: TypeTag) {
        self.column_types.insert(column.to_string(), type_tag);
    }

    fn register_reconciler(&self, type_tag: TypeTag, reconcile: ReconcileFn) {
        self.reconcilers.insert(type_tag, reconcile);
    }
}
