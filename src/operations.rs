//! ## Write operations
//! A column write is planned as one round of register cell writes, then handed to the store.
//!
//! - [`Overwrite`] replaces the whole estimator. Every one of the `2^p` cells is written
//!   with a [`CellMutation::Reset`], so values from a previous estimator cannot come back
//!   through reconciliation. Registers the new elements do not touch get `Reset(0)`.
//! - [`Add`] writes [`CellMutation::Merge`] for the registers its elements touch and leaves
//!   every other cell alone.
//!
//! Neither reads current state first. Retrying a write after a timeout is safe: rewriting
//! the same register values changes nothing under `max`.

use std::collections::BTreeMap;

use enum_dispatch::enum_dispatch;
use tracing::debug;

use crate::error::Result;
use crate::hyperloglog::{hash_element, register_index_and_rank, Precision, Sketch, DEFAULT_HASH_SEED};
use crate::literal::PendingElements;
use crate::storage::{CellMutation, CellStore, CellWrite, WriteParams};

/// Write operations supported on a hyperloglog column
#[derive(Clone, Debug, PartialEq, Eq)]
#[enum_dispatch]
pub enum Operation {
    Overwrite(Overwrite),
    Add(Add),
}

/// Operation trait which must be implemented by all write operations.
#[enum_dispatch(Operation)]
pub trait ColumnOperation {
    fn kind(&self) -> &'static str;
    /// Whether existing cells must be fetched before planning. Register cells reconcile
    /// on their own, so no hyperloglog operation needs a read.
    fn requires_read(&self) -> bool {
        false
    }
    /// Cell writes implementing this operation.
    fn plan(&self, precision: Precision, params: WriteParams) -> Vec<CellWrite>;
}

/// Replace the estimator with one built from the given elements only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overwrite {
    elements: PendingElements,
}

impl Overwrite {
    pub fn new(elements: PendingElements) -> Self {
        Self { elements }
    }
}

impl ColumnOperation for Overwrite {
    fn kind(&self) -> &'static str {
        "overwrite"
    }

    fn plan(&self, precision: Precision, params: WriteParams) -> Vec<CellWrite> {
        let mut sketch = Sketch::new(precision);
        for element in self.elements.iter() {
            sketch.insert(element);
        }
        sketch
            .registers()
            .iter()
            .enumerate()
            .map(|(index, &rank)| CellWrite {
                index: index as u32,
                timestamp: params.timestamp,
                mutation: CellMutation::Reset(rank),
            })
            .collect()
    }
}

/// Merge the given elements into whatever the column already holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Add {
    elements: PendingElements,
}

impl Add {
    pub fn new(elements: PendingElements) -> Self {
        Self { elements }
    }
}

impl ColumnOperation for Add {
    fn kind(&self) -> &'static str {
        "add"
    }

    fn plan(&self, precision: Precision, params: WriteParams) -> Vec<CellWrite> {
        let mut updates = BTreeMap::<u32, u8>::new();
        for element in self.elements.iter() {
            let (index, rank) =
                register_index_and_rank(hash_element(element, DEFAULT_HASH_SEED), precision);
            let register = updates.entry(index).or_default();
            *register = (*register).max(rank);
        }
        updates
            .into_iter()
            .map(|(index, rank)| CellWrite {
                index,
                timestamp: params.timestamp,
                mutation: CellMutation::Merge(rank),
            })
            .collect()
    }
}

/// Plan `operation` and submit its writes for `(row, column)` in one round.
/// Returns the number of cell writes issued. Storage failures are returned unchanged.
pub fn execute<S: CellStore + ?Sized>(
    operation: &Operation,
    store: &S,
    row: &[u8],
    column: &str,
    precision: Precision,
    params: WriteParams,
) -> Result<usize> {
    let writes = operation.plan(precision, params);
    debug!(
        kind = operation.kind(),
        column,
        cells = writes.len(),
        timestamp = params.timestamp,
        "writing hyperloglog registers"
    );
    store.write_cells(row, column, &writes)?;
    Ok(writes.len())
}
