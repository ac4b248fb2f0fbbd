//! Read assembler: rebuilds a column's estimator from its register cells.
//!
//! Cells are read as independent point reads with no snapshot across them. A reader racing
//! writers may see some registers updated and others not, which only ever yields a sketch
//! between the old and the new state.

use tracing::{debug, warn};

use crate::error::{HllError, Result};
use crate::hyperloglog::Sketch;
use crate::schema::{ColumnSchema, EstimatorKind};
use crate::storage::CellStore;

/// Assemble the sketch stored for `(row, schema.name())`.
///
/// Register cells still carrying several unreconciled versions are merged with `max`.
/// Missing cells are zero registers, so a column never written reads as an empty sketch.
pub fn read_sketch<S: CellStore + ?Sized>(
    store: &S,
    row: &[u8],
    schema: &ColumnSchema,
) -> Result<Sketch> {
    let precision = schema.precision();
    let cells = store.read_cells(row, schema.name())?;
    let mut registers = vec![0u8; precision.registers()];

    for (index, versions) in &cells {
        let Some(register) = registers.get_mut(*index as usize) else {
            warn!(
                column = schema.name(),
                index,
                registers = precision.registers(),
                "register cell index out of range"
            );
            return Err(HllError::CorruptSketch(format!(
                "register index {index} out of range for precision {precision}"
            )));
        };
        *register = versions.iter().copied().fold(*register, u8::max);
    }

    debug!(
        column = schema.name(),
        cells = cells.len(),
        "assembled hyperloglog from register cells"
    );
    Sketch::from_registers(precision, registers)
}

/// Packed column value, as handed to query results.
pub fn read_packed<S: CellStore + ?Sized>(
    store: &S,
    row: &[u8],
    schema: &ColumnSchema,
) -> Result<Vec<u8>> {
    Ok(read_sketch(store, row, schema)?.to_packed())
}

/// Cardinality estimate of the column, using the column's configured estimator.
pub fn read_estimate<S: CellStore + ?Sized>(
    store: &S,
    row: &[u8],
    schema: &ColumnSchema,
) -> Result<f64> {
    let sketch = read_sketch(store, row, schema)?;
    Ok(match schema.estimator() {
        EstimatorKind::Classic => sketch.estimate(),
        EstimatorKind::LogLogBeta => sketch.estimate_loglog_beta(),
    })
}
