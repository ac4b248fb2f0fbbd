//! Per-cell conflict resolution for register cells.
//!
//! Whenever two versions of the same register cell coexist (concurrent writers,
//! diverged replicas, compaction), the storage layer resolves them with
//! [`reconcile`] instead of last-write-wins. Since `max` is the register merge rule,
//! writers never have to read before writing: each one writes its own register
//! values and the cells converge to the merge of everything written.

use crate::storage::CellStore;
use crate::types::HyperLogLogType;

/// Resolution function for two versions of one cell: `(existing, incoming) -> resolved`.
pub type ReconcileFn = fn(u8, u8) -> u8;

/// Register cell reconciliation: the larger rank wins.
#[inline]
pub fn reconcile(existing: u8, incoming: u8) -> u8 {
    existing.max(incoming)
}

/// Last-write-wins, what a store applies to cells of types without a registered reconciler.
#[inline]
pub fn last_write_wins(_existing: u8, incoming: u8) -> u8 {
    incoming
}

/// Parameterize `store`'s conflict path for the hyperloglog type with [`reconcile`].
pub fn install<S: CellStore + ?Sized>(store: &S) {
    store.register_reconciler(HyperLogLogType::TAG, reconcile);
}
