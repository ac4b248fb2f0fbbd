use crate::error::Result;
use crate::hyperloglog::Sketch;
use crate::literal::{bind, Literal};
use crate::operations::{execute, Add, Operation, Overwrite};
use crate::read::{read_estimate, read_packed, read_sketch};
use crate::reconcile;
use crate::schema::ColumnSchema;
use crate::storage::{CellStore, WriteParams};

/// A hyperloglog column backed by a [`CellStore`].
///
/// Creating the column declares its type to the store and installs the register
/// reconciler, after which any number of writers may share the same store concurrently.
pub struct HllColumn<'a, S: CellStore + ?Sized> {
    schema: ColumnSchema,
    store: &'a S,
}

impl<'a, S: CellStore + ?Sized> HllColumn<'a, S> {
    pub fn new(schema: ColumnSchema, store: &'a S) -> Self {
        store.declare_column(schema.name(), schema.type_tag());
        reconcile::install(store);
        Self { schema, store }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// `SET col = hll{...}`: replace the stored estimator.
    pub fn overwrite(&self, row: &[u8], literal: &Literal, params: WriteParams) -> Result<()> {
        let elements = bind(literal, &self.schema)?;
        self.apply(row, Overwrite::new(elements).into(), params)
    }

    /// `SET col = col + hll{...}`: merge elements into the stored estimator.
    pub fn add(&self, row: &[u8], literal: &Literal, params: WriteParams) -> Result<()> {
        let elements = bind(literal, &self.schema)?;
        self.apply(row, Add::new(elements).into(), params)
    }

    fn apply(&self, row: &[u8], operation: Operation, params: WriteParams) -> Result<()> {
        execute(
            &operation,
            self.store,
            row,
            self.schema.name(),
            self.schema.precision(),
            params,
        )?;
        Ok(())
    }

    /// Packed column value for `row`.
    pub fn read(&self, row: &[u8]) -> Result<Vec<u8>> {
        read_packed(self.store, row, &self.schema)
    }

    pub fn sketch(&self, row: &[u8]) -> Result<Sketch> {
        read_sketch(self.store, row, &self.schema)
    }

    pub fn estimate(&self, row: &[u8]) -> Result<f64> {
        read_estimate(self.store, row, &self.schema)
    }
}
