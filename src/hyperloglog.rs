//! ## HyperLogLog estimator core
//! Pure algorithm, no I/O: hashing, register index/rank mapping, register update,
//! merge and cardinality estimation.
//!
//! Registers are plain `u8` counters, one per index in `[0, 2^p)`. A register holds
//! the maximum rank ever observed for the elements hashing into it, so registers only
//! ever grow and merging two register arrays is an elementwise `max`. That merge is
//! commutative, associative and idempotent, which is what lets independent writers
//! converge without coordination.
//!
//! Constants used by [`estimate`]:
//! - hash: `wyhash(element, seed)`, 64 bits
//! - index: top `p` bits of the hash; rank: `1 + leading_zeros(hash << p)`, capped at `64 - p + 1`
//! - `α_16 = 0.673`, `α_32 = 0.697`, `α_64 = 0.709`, otherwise `0.7213 / (1 + 1.079 / m)`
//! - small range: linear counting `m · ln(m / V)` when `E <= 2.5 · m` and `V > 0` zero registers
//! - large range: `-2^64 · ln(1 - E / 2^64)` when `E > 2^64 / 30`

use std::fmt::{Display, Formatter};

use wyhash::wyhash;

use crate::beta::beta_horner;
use crate::codec;
use crate::error::{HllError, Result};

/// Seed used by every write path. All writers of a column must hash identically.
pub const DEFAULT_HASH_SEED: u64 = 0;

/// Size of the hash space, `2^64`.
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
/// Raw estimates above this value get the large range correction.
const LARGE_RANGE_THRESHOLD: f64 = TWO_POW_64 / 30.0;

/// Number of index bits `p`, validated to lie in `[4, 16]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Precision(u8);

impl Precision {
    pub const MIN: u8 = 4;
    pub const MAX: u8 = 16;
    pub const DEFAULT: Precision = Precision(12);

    /// Validate `p`, failing with `PrecisionOutOfRange`.
    #[inline]
    pub fn new(p: u8) -> Result<Self> {
        Self::try_from(i64::from(p))
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Number of registers `m = 2^p`
    #[inline]
    pub fn registers(self) -> usize {
        1 << self.0
    }

    /// Highest rank a register can take at this precision
    #[inline]
    pub fn max_rank(self) -> u8 {
        64 - self.0 + 1
    }
}

impl TryFrom<i64> for Precision {
    type Error = HllError;

    fn try_from(p: i64) -> Result<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&p) {
            Ok(Self(p as u8))
        } else {
            Err(HllError::PrecisionOutOfRange(p))
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash element bytes into 64 bits. Identical bytes and seed always give the same hash.
#[inline]
pub fn hash_element(bytes: &[u8], seed: u64) -> u64 {
    wyhash(bytes, seed)
}

/// Map a hash to its register index (top `p` bits) and rank (`1 +` leading zeros of the rest).
#[inline]
pub fn register_index_and_rank(hash: u64, precision: Precision) -> (u32, u8) {
    let p = u32::from(precision.get());
    let index = (hash >> (64 - p)) as u32;
    let rank = ((hash << p).leading_zeros() + 1).min(64 - p + 1);
    (index, rank as u8)
}

/// Raise register `index` to `rank`. Returns whether the register changed.
#[inline]
pub fn update(registers: &mut [u8], index: u32, rank: u8) -> bool {
    let register = &mut registers[index as usize];
    if rank > *register {
        *register = rank;
        true
    } else {
        false
    }
}

/// Elementwise max of two register arrays of the same length.
pub fn merge(lhs: &[u8], rhs: &[u8]) -> Vec<u8> {
    let mut merged = lhs.to_vec();
    merge_into(&mut merged, rhs);
    merged
}

/// Elementwise max of `rhs` into `lhs`.
#[inline]
pub fn merge_into(lhs: &mut [u8], rhs: &[u8]) {
    debug_assert_eq!(lhs.len(), rhs.len());
    for (l, &r) in lhs.iter_mut().zip(rhs) {
        *l = (*l).max(r);
    }
}

/// Harmonic sum `Σ 2^(-r)` and number of zero registers
#[inline]
fn sum_and_zeros(registers: &[u8]) -> (f64, usize) {
    registers.iter().fold((0.0, 0), |(sum, zeros), &r| {
        (sum + (-f64::from(r)).exp2(), zeros + usize::from(r == 0))
    })
}

/// Estimate cardinality with the classic HyperLogLog estimator and its range corrections.
pub fn estimate(registers: &[u8], precision: Precision) -> f64 {
    let m = precision.registers() as f64;
    let (sum, zeros) = sum_and_zeros(registers);
    let raw = alpha(precision.registers()) * m * m / sum;

    if raw <= 2.5 * m && zeros > 0 {
        return m * (m / zeros as f64).ln();
    }
    if raw > LARGE_RANGE_THRESHOLD && raw < TWO_POW_64 {
        return -TWO_POW_64 * (1.0 - raw / TWO_POW_64).ln();
    }
    raw
}

/// Estimate cardinality with LogLog-Beta bias correction.
pub fn estimate_loglog_beta(registers: &[u8], precision: Precision) -> f64 {
    let m = precision.registers() as f64;
    let (sum, zeros) = sum_and_zeros(registers);
    let zeros = zeros as f64;
    alpha(precision.registers()) * m * (m - zeros) / (sum + beta_horner(zeros, precision))
}

/// Parameter for bias correction
#[inline]
fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}

/// Transient estimator, materialized at write time to compute register updates and at
/// read time from register cells. Never kept between requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sketch {
    precision: Precision,
    registers: Vec<u8>,
}

impl Sketch {
    /// Create an empty sketch (all registers zero)
    pub fn new(precision: Precision) -> Self {
        Self {
            precision,
            registers: vec![0; precision.registers()],
        }
    }

    /// Create a sketch from an existing register array of length `2^p`.
    pub fn from_registers(precision: Precision, registers: Vec<u8>) -> Result<Self> {
        if registers.len() != precision.registers() {
            return Err(HllError::CorruptSketch(format!(
                "expected {} registers for precision {}, got {}",
                precision.registers(),
                precision,
                registers.len()
            )));
        }
        Ok(Self {
            precision,
            registers,
        })
    }

    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    #[inline]
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn into_registers(self) -> Vec<u8> {
        self.registers
    }

    /// Whether no element was ever observed
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    /// Insert element bytes hashed with [`DEFAULT_HASH_SEED`]. Returns whether a register changed.
    #[inline]
    pub fn insert(&mut self, item: &[u8]) -> bool {
        self.insert_hash(hash_element(item, DEFAULT_HASH_SEED))
    }

    /// Insert an already computed hash. Returns whether a register changed.
    #[inline]
    pub fn insert_hash(&mut self, hash: u64) -> bool {
        let (index, rank) = register_index_and_rank(hash, self.precision);
        update(&mut self.registers, index, rank)
    }

    /// Merge `rhs` into `self`.
    pub fn merge(&mut self, rhs: &Sketch) -> Result<()> {
        if self.precision != rhs.precision {
            return Err(HllError::PrecisionMismatch {
                left: self.precision.get(),
                right: rhs.precision.get(),
            });
        }
        merge_into(&mut self.registers, &rhs.registers);
        Ok(())
    }

    /// Classic HyperLogLog estimate, see [`estimate`].
    pub fn estimate(&self) -> f64 {
        estimate(&self.registers, self.precision)
    }

    /// LogLog-Beta estimate, see [`estimate_loglog_beta`].
    pub fn estimate_loglog_beta(&self) -> f64 {
        estimate_loglog_beta(&self.registers, self.precision)
    }

    /// Packed form `[version, precision, registers...]`
    pub fn to_packed(&self) -> Vec<u8> {
        codec::encode(self.precision, &self.registers)
    }

    pub fn from_packed(bytes: &[u8]) -> Result<Self> {
        let (precision, registers) = codec::decode(bytes)?;
        Ok(Self {
            precision,
            registers,
        })
    }
}

impl Display for Sketch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hyperloglog(p={}, estimate={:.0})",
            self.precision,
            self.estimate()
        )
    }
}
