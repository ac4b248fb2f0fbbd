#![no_main]

use hll_column::codec::decode;
use hll_column::Sketch;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok((precision, registers)) = decode(data) {
        assert_eq!(registers.len(), precision.registers());
        let sketch = Sketch::from_registers(precision, registers).unwrap();
        assert!(sketch.estimate() >= 0.0);
        assert_eq!(sketch.to_packed(), data);
    }
    if let Ok(mut sketch) = serde_json::from_slice::<Sketch>(data) {
        sketch.insert(b"1");
        assert!(sketch.estimate() > 0.0);
    }
});
