#![no_main]

use hll_column::{Precision, Sketch};
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let precision = Precision::new(4 + data[0] % 13).unwrap();
    let split_index = wyhash(data, 0) as usize % data.len();
    let (first_half, second_half) = data.split_at(split_index);

    let mut sketch1 = Sketch::new(precision);
    for chunk in first_half.chunks(4) {
        sketch1.insert(chunk);
        assert!(sketch1.estimate() > 0.0);
    }

    let mut sketch2 = Sketch::new(precision);
    for chunk in second_half.chunks(4) {
        sketch2.insert(chunk);
        assert!(sketch2.estimate() > 0.0);
    }

    let mut whole = Sketch::new(precision);
    for chunk in first_half.chunks(4).chain(second_half.chunks(4)) {
        whole.insert(chunk);
    }

    let mut merged = sketch1.clone();
    merged.merge(&sketch2).unwrap();
    assert_eq!(merged, whole);
    sketch2.merge(&sketch1).unwrap();
    assert_eq!(sketch2, whole);
});
