//! ## Packed sketch format
//! The external and on-disk form of a complete estimator:
//!
//! - byte 0        - format version (currently `1`)
//! - byte 1        - precision `p`
//! - bytes 2..     - `2^p` registers, one byte each
//!
//! Total length is `2 + 2^p`. Register contents are not validated: any byte value is legal.

use std::cmp::Ordering;

use crate::error::{HllError, Result};
use crate::hyperloglog::Precision;

/// Format version written by [`encode`]
pub const FORMAT_VERSION: u8 = 1;
/// Length of the version and precision header
pub const HEADER_LEN: usize = 2;

const VERSION_BYTE: usize = 0;
const PRECISION_BYTE: usize = 1;

/// Expected packed length for `precision`
#[inline]
pub fn packed_len(precision: Precision) -> usize {
    HEADER_LEN + precision.registers()
}

/// Pack `registers` behind the version and precision header.
pub fn encode(precision: Precision, registers: &[u8]) -> Vec<u8> {
    debug_assert_eq!(registers.len(), precision.registers());
    let mut bytes = Vec::with_capacity(HEADER_LEN + registers.len());
    bytes.push(FORMAT_VERSION);
    bytes.push(precision.get());
    bytes.extend_from_slice(registers);
    bytes
}

/// Unpack a packed sketch into its precision and registers.
pub fn decode(bytes: &[u8]) -> Result<(Precision, Vec<u8>)> {
    if bytes.len() < HEADER_LEN {
        return Err(HllError::CorruptSketch(format!(
            "packed sketch too short ({} < {HEADER_LEN} bytes)",
            bytes.len()
        )));
    }

    let version = bytes[VERSION_BYTE];
    if version != FORMAT_VERSION {
        return Err(HllError::UnsupportedVersion(version));
    }

    let precision = Precision::new(bytes[PRECISION_BYTE]).map_err(|_| {
        HllError::CorruptSketch(format!("invalid precision {}", bytes[PRECISION_BYTE]))
    })?;

    if bytes.len() != packed_len(precision) {
        return Err(HllError::CorruptSketch(format!(
            "expected {} bytes for precision {precision}, got {}",
            packed_len(precision),
            bytes.len()
        )));
    }

    Ok((precision, bytes[HEADER_LEN..].to_vec()))
}

/// Comparator of the `HYPERLOGLOG` type: unsigned byte-lexicographic order of packed forms.
/// Only meaningful for indexing and ordering, not for estimator semantics.
#[inline]
pub fn compare_packed(lhs: &[u8], rhs: &[u8]) -> Ordering {
    lhs.cmp(rhs)
}
