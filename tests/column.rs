use std::collections::BTreeMap;
use std::io;

use hll_column::codec::decode;
use hll_column::storage::{CellMutation, CellWrite};
use hll_column::types::TypeTag;
use hll_column::{
    CellStore, ColumnSchema, ElementType, HllColumn, HllError, Literal, MemoryCellStore,
    Precision, Sketch, Term, WriteParams,
};

const ROW: &[u8] = b"page:1";

fn schema() -> ColumnSchema {
    ColumnSchema::new("visitors", Precision::new(12).unwrap(), ElementType::Text)
}

fn hll(items: &[&str]) -> Literal {
    items.iter().copied().map(Term::text).collect()
}

fn at(timestamp: u64) -> WriteParams {
    WriteParams::new(timestamp)
}

#[test]
fn test_overwrite_then_estimate() {
    let store = MemoryCellStore::new();
    let column = HllColumn::new(schema(), &store);
    column.overwrite(ROW, &hll(&["a", "b", "c"]), at(1)).unwrap();
    assert_eq!(column.estimate(ROW).unwrap().round(), 3.0);
}

#[test]
fn test_concurrent_adds_converge() {
    let store = MemoryCellStore::new();
    let column = HllColumn::new(schema(), &store);
    column.overwrite(ROW, &hll(&["a", "b", "c"]), at(1)).unwrap();

    std::thread::scope(|s| {
        s.spawn(|| column.add(ROW, &hll(&["a"]), at(2)).unwrap());
        s.spawn(|| column.add(ROW, &hll(&["d", "e"]), at(2)).unwrap());
    });
    assert_eq!(column.estimate(ROW).unwrap().round(), 5.0);

    let mut expected = Sketch::new(Precision::new(12).unwrap());
    for item in ["a", "b", "c", "d", "e"] {
        expected.insert(item.as_bytes());
    }
    assert_eq!(column.sketch(ROW).unwrap(), expected);
}

#[test]
fn test_adds_commute() {
    let items = ["u1", "u2", "u3", "u4", "u5", "u6"];
    let packed = |order: &[usize]| {
        let store = MemoryCellStore::new();
        let column = HllColumn::new(schema(), &store);
        for (ts, &i) in order.iter().enumerate() {
            column.add(ROW, &hll(&[items[i]]), at(ts as u64)).unwrap();
        }
        column.read(ROW).unwrap()
    };
    assert_eq!(packed(&[0, 1, 2, 3, 4, 5]), packed(&[5, 3, 1, 0, 4, 2]));
}

#[test]
fn test_unwritten_column_reads_empty() {
    let store = MemoryCellStore::new();
    let column = HllColumn::new(schema(), &store);

    assert_eq!(column.estimate(ROW).unwrap(), 0.0);
    let (precision, registers) = decode(&column.read(ROW).unwrap()).unwrap();
    assert_eq!(precision.get(), 12);
    assert_eq!(registers.len(), 4096);
    assert!(registers.iter().all(|&r| r == 0));
}

#[test]
fn test_empty_overwrite_clears() {
    let store = MemoryCellStore::new();
    let column = HllColumn::new(schema(), &store);
    column.add(ROW, &hll(&["a", "b"]), at(1)).unwrap();
    column.overwrite(ROW, &Literal::default(), at(2)).unwrap();
    assert!(column.sketch(ROW).unwrap().is_empty());
}

#[test]
fn test_overwrite_hides_larger_stale_registers() {
    let store = MemoryCellStore::new();
    let column = HllColumn::new(schema(), &store);

    let many: Vec<String> = (0..1000).map(|i| format!("user-{i}")).collect();
    let many: Literal = many.iter().map(|s| Term::text(s)).collect();
    column.add(ROW, &many, at(10)).unwrap();
    assert!(column.estimate(ROW).unwrap() > 900.0);

    column.overwrite(ROW, &hll(&["x"]), at(20)).unwrap();
    assert_eq!(column.estimate(ROW).unwrap().round(), 1.0);

    // an add issued before the overwrite but delivered after it stays hidden
    column.add(ROW, &many, at(15)).unwrap();
    assert_eq!(column.estimate(ROW).unwrap().round(), 1.0);

    column.add(ROW, &hll(&["y"]), at(30)).unwrap();
    assert_eq!(column.estimate(ROW).unwrap().round(), 2.0);
}

#[test]
fn test_retried_add_is_idempotent() {
    let store = MemoryCellStore::new();
    let column = HllColumn::new(schema(), &store);
    column.add(ROW, &hll(&["a", "b"]), at(1)).unwrap();
    let once = column.read(ROW).unwrap();
    column.add(ROW, &hll(&["a", "b"]), at(2)).unwrap();
    assert_eq!(column.read(ROW).unwrap(), once);
}

#[test]
fn test_rejected_literal_writes_nothing() {
    let store = MemoryCellStore::new();
    let column = HllColumn::new(
        ColumnSchema::new("ids", Precision::new(8).unwrap(), ElementType::Int),
        &store,
    );
    let literal = Literal::new(vec![Term::int(1), Term::text("two")]);
    assert!(matches!(
        column.add(ROW, &literal, at(1)),
        Err(HllError::TypeMismatch { .. })
    ));
    assert!(matches!(
        column.overwrite(ROW, &Literal::new(vec![Term::Null]), at(1)),
        Err(HllError::NullElement { .. })
    ));
    assert!(store.read_cells(ROW, "ids").unwrap().is_empty());
}

#[test]
fn test_out_of_range_cell_is_corrupt() {
    let store = MemoryCellStore::new();
    let column = HllColumn::new(schema(), &store);
    store
        .write_cell(
            ROW,
            "visitors",
            CellWrite {
                index: 4096,
                timestamp: 1,
                mutation: CellMutation::Merge(3),
            },
        )
        .unwrap();
    assert!(matches!(column.read(ROW), Err(HllError::CorruptSketch(_))));
}

#[test]
fn test_estimator_option_is_used_on_read() {
    let store = MemoryCellStore::new();
    let beta = HllColumn::new(
        schema().with_estimator(hll_column::EstimatorKind::LogLogBeta),
        &store,
    );
    let items: Vec<String> = (0..5000).map(|i| i.to_string()).collect();
    beta.add(ROW, &items.iter().map(|s| Term::text(s)).collect::<Literal>(), at(1))
        .unwrap();
    let sketch = beta.sketch(ROW).unwrap();
    assert_eq!(beta.estimate(ROW).unwrap(), sketch.estimate_loglog_beta());
}

/// Store whose every operation fails.
struct UnavailableStore;

impl CellStore for UnavailableStore {
    fn write_cell(&self, _row: &[u8], _column: &str, _write: CellWrite) -> hll_column::Result<()> {
        Err(HllError::storage(io::Error::new(
            io::ErrorKind::TimedOut,
            "replica timed out",
        )))
    }

    fn read_cells(&self, _row: &[u8], _column: &str) -> hll_column::Result<BTreeMap<u32, Vec<u8>>> {
        Err(HllError::storage(io::Error::new(
            io::ErrorKind::NotConnected,
            "no replica available",
        )))
    }

    fn declare_column(&self, _column: &str, _type_tag: TypeTag) {}

    fn register_reconciler(&self, _type_tag: TypeTag, _reconcile: hll_column::reconcile::ReconcileFn) {}
}

#[test]
fn test_storage_failures_propagate() {
    let store = UnavailableStore;
    let column = HllColumn::new(schema(), &store);

    let err = column.add(ROW, &hll(&["a"]), at(1)).unwrap_err();
    assert!(matches!(err, HllError::Storage(_)));
    assert_eq!(err.to_string(), "storage failure: replica timed out");

    let err = column.read(ROW).unwrap_err();
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(
        source.downcast_ref::<io::Error>().map(io::Error::kind),
        Some(io::ErrorKind::NotConnected)
    );
}
