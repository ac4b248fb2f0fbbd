//! `hll-column` implements a HyperLogLog column type for a distributed wide-column store,
//! estimating the number of distinct elements written to a cell without storing them.
//!
//! # Storage layout
//! A column with precision `p` owns `2^p` register cells per row, one cell per register
//! index. Writers never read before writing:
//! - `col = hll{...}` writes every register cell with a clear marker carrying the new value.
//! - `col = col + hll{...}` writes only the registers its elements raise.
//!
//! Conflicting versions of a register cell are reconciled with `max`, so concurrent writers
//! on any replica converge to the merge of everything written.
//!
//! # Wire format
//! Reads assemble the registers into `[version = 1, p, r_0, ..., r_{2^p - 1}]`.
//!
//! # Usage
//! ```
//! use hll_column::{ColumnSchema, ElementType, HllColumn, Literal, MemoryCellStore, Precision, Term, WriteParams};
//!
//! let store = MemoryCellStore::new();
//! let schema = ColumnSchema::new("visitors", Precision::new(12).unwrap(), ElementType::Text);
//! let column = HllColumn::new(schema, &store);
//!
//! let literal: Literal = ["a", "b", "c"].into_iter().map(Term::text).collect();
//! column.overwrite(b"page", &literal, WriteParams::now()).unwrap();
//! assert_eq!(column.estimate(b"page").unwrap().round(), 3.0);
//! ```
mod beta;
pub mod codec;
mod column;
pub mod error;
pub mod hyperloglog;
pub mod literal;
pub mod operations;
pub mod read;
pub mod reconcile;
pub mod schema;
#[cfg(feature = "with_serde")]
mod serde;
pub mod storage;
pub mod types;

pub use column::HllColumn;
pub use error::{HllError, Result};
pub use hyperloglog::{Precision, Sketch};
pub use literal::{Literal, Term};
pub use schema::{ColumnSchema, EstimatorKind};
pub use storage::{CellStore, MemoryCellStore, WriteParams};
pub use types::ElementType;
