//! ## HyperLogLog estimator
//! Estimates the number of distinct values in a stream using `M = 2^P` one-byte registers.
//!
//! [Original HyperLogLog paper](https://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)
//!
//! For a `W`-bit hash `h` of every inserted value:
//! - top `P` bits of `h` select the register,
//! - remaining `W - P` bits, left-aligned, give the rank: leading zeros + 1,
//!   or `W - P + 1` when all of them are zero,
//! - register keeps the maximum rank observed.
//!
//! Expected relative error is `1.04 / sqrt(M)`:
//!   P = 10: 3.25%
//!   P = 12: 1.62%
//!   P = 14: 0.81%
//!
//! Small cardinalities switch to linear counting while the raw estimate is at
//! most `2.5 * M` and some register is still zero. Large-range correction is
//! not part of `estimate`; see `estimate_with_large_range_correction`.

use std::fmt::{Debug, Formatter};

use crate::error::{ConfigError, Result};
use crate::hash::{HashFunction, HashWord};

/// Largest supported precision (16 MiB of registers)
pub const MAX_PRECISION: u8 = 24;

/// HyperLogLog cardinality estimator parameterized by its hash function.
#[derive(Clone)]
pub struct HyperLogLog<H: HashFunction> {
    /// Number of hash bits used for the register index
    precision: u8,
    /// `2^precision` registers, allocated once
    registers: Box<[u8]>,
    hasher: H,
}

impl<H: HashFunction> HyperLogLog<H> {
    /// Create new estimator with `2^precision` zero registers
    pub fn new(precision: u8, hasher: H) -> Result<Self> {
        let hash_bits = <H::Output as HashWord>::BITS;
        if precision == 0 {
            return Err(ConfigError::PrecisionTooSmall);
        }
        if u32::from(precision) > hash_bits {
            return Err(ConfigError::PrecisionExceedsHashWidth {
                precision,
                hash_bits,
            });
        }
        if precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionTooLarge {
                precision,
                max: MAX_PRECISION,
            });
        }

        let m = 1usize << precision;
        tracing::debug!(precision, registers = m, hash_bits, "created hyperloglog");

        Ok(Self {
            precision,
            registers: vec![0u8; m].into_boxed_slice(),
            hasher,
        })
    }

    /// Insert a value into the estimator
    #[inline]
    pub fn add<V: AsRef<[u8]> + ?Sized>(&mut self, value: &V) {
        let hash = self.hasher.hash(value.as_ref());
        let (idx, rank) = self.index_and_rank(hash);
        // SAFETY: `HashWord` is sealed to `u32` and `u64`, whose `high_bits(precision)`
        // is always below `2^precision`.
        let register = unsafe { self.registers.get_unchecked_mut(idx) };
        *register = (*register).max(rank);
    }

    /// Split hash into register index and rank of the remaining bits
    #[inline]
    fn index_and_rank(&self, hash: H::Output) -> (usize, u8) {
        let p = u32::from(self.precision);
        let idx = hash.high_bits(p);
        (idx, Self::rank(hash.shl_truncating(p), p))
    }

    /// Position of the leftmost 1-bit in left-aligned `remaining` bits
    #[inline]
    fn rank(remaining: H::Output, precision: u32) -> u8 {
        if remaining == <H::Output as HashWord>::ZERO {
            (<H::Output as HashWord>::BITS - precision + 1) as u8
        } else {
            (remaining.leading_zeros() + 1) as u8
        }
    }

    /// Return cardinality estimate
    pub fn estimate(&self) -> f64 {
        let m = self.register_count() as f64;
        let (sum, zeros) = self.registers.iter().fold((0.0f64, 0usize), |(sum, zeros), &r| {
            (sum + 2f64.powi(-i32::from(r)), zeros + usize::from(r == 0))
        });

        let estimate = alpha(self.register_count()) * m * m / sum;
        if estimate <= 2.5 * m && zeros > 0 {
            linear_counting(m, zeros as f64)
        } else {
            estimate
        }
    }

    /// Return cardinality estimate with the classic correction for estimates
    /// approaching the size of the hash space (`2^W`).
    pub fn estimate_with_large_range_correction(&self) -> f64 {
        let estimate = self.estimate();
        let space = 2f64.powi(<H::Output as HashWord>::BITS as i32);
        if estimate > space / 30.0 && estimate < space {
            -space * (1.0 - estimate / space).ln()
        } else {
            estimate
        }
    }

    /// Clear all registers, keeping precision and hash function
    pub fn reset(&mut self) {
        self.registers.fill(0);
        tracing::debug!(precision = self.precision, "reset hyperloglog");
    }

    /// Number of registers, `2^precision`
    #[inline]
    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    #[inline]
    pub fn precision_bits(&self) -> u8 {
        self.precision
    }

    #[inline]
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    /// Number of registers that have not been touched yet
    pub fn zero_registers(&self) -> usize {
        self.registers.iter().filter(|&&r| r == 0).count()
    }

    #[inline]
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Expected relative standard error `1.04 / sqrt(M)`
    pub fn relative_standard_error(&self) -> f64 {
        1.04 / (self.register_count() as f64).sqrt()
    }
}

impl<H: HashFunction> Debug for HyperLogLog<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, registers: {}, zeros: {}, estimate: {:.4} }}",
            self.precision,
            self.register_count(),
            self.zero_registers(),
            self.estimate()
        )
    }
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

/// Linear counting estimate for `m` registers of which `zeros` are empty
#[inline]
fn linear_counting(m: f64, zeros: f64) -> f64 {
    m * (m / zeros).ln()
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::hash::{
        Fnv1a32, PolyHash32, WyHash64, DEFAULT_FNV_BASE, DEFAULT_HASH_SEED, DEFAULT_POLY_BASE,
    };
    use test_case::test_case;

    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-";

    /// Deterministic 8-character alphanumeric key derived from `i` with splitmix64
    pub(crate) fn sample_key(i: u64) -> [u8; 8] {
        let mut z = (i + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;

        let mut key = [0u8; 8];
        for (k, c) in key.iter_mut().enumerate() {
            *c = ALPHABET[((z >> (k * 6)) & 63) as usize % ALPHABET.len()];
        }
        key
    }

    fn fnv() -> Fnv1a32 {
        Fnv1a32::new(DEFAULT_FNV_BASE, DEFAULT_HASH_SEED)
    }

    fn poly() -> PolyHash32 {
        PolyHash32::new(DEFAULT_POLY_BASE, DEFAULT_HASH_SEED)
    }

    fn evaluate<H: HashFunction>(mut e: HyperLogLog<H>, n: u64) -> String {
        for i in 0..n {
            e.add(&sample_key(i));
        }
        format!("{:?}", e)
    }

    #[test_case(0 => "{ precision: 10, registers: 1024, zeros: 1024, estimate: 0.0000 }")]
    #[test_case(1 => "{ precision: 10, registers: 1024, zeros: 1023, estimate: 1.0005 }")]
    #[test_case(100 => "{ precision: 10, registers: 1024, zeros: 932, estimate: 96.3983 }")]
    #[test_case(1000 => "{ precision: 10, registers: 1024, zeros: 432, estimate: 883.7593 }")]
    #[test_case(10_000 => "{ precision: 10, registers: 1024, zeros: 8, estimate: 8049.0134 }")]
    fn test_estimator_p10_fnv1a(n: u64) -> String {
        evaluate(HyperLogLog::new(10, fnv()).unwrap(), n)
    }

    #[test_case(0 => "{ precision: 12, registers: 4096, zeros: 4096, estimate: 0.0000 }")]
    #[test_case(1 => "{ precision: 12, registers: 4096, zeros: 4095, estimate: 1.0001 }")]
    #[test_case(100 => "{ precision: 12, registers: 4096, zeros: 4000, estimate: 97.1429 }")]
    #[test_case(1000 => "{ precision: 12, registers: 4096, zeros: 3272, estimate: 920.0004 }")]
    #[test_case(10_000 => "{ precision: 12, registers: 4096, zeros: 1529, estimate: 4036.1860 }")]
    fn test_estimator_p12_poly(n: u64) -> String {
        evaluate(HyperLogLog::new(12, poly()).unwrap(), n)
    }

    #[test_case(0 => Err(ConfigError::PrecisionTooSmall))]
    #[test_case(1 => Ok(2))]
    #[test_case(4 => Ok(16))]
    #[test_case(16 => Ok(65536))]
    #[test_case(24 => Ok(1 << 24))]
    #[test_case(25 => Err(ConfigError::PrecisionTooLarge { precision: 25, max: MAX_PRECISION }))]
    #[test_case(33 => Err(ConfigError::PrecisionExceedsHashWidth { precision: 33, hash_bits: 32 }))]
    fn test_new_precision(precision: u8) -> Result<usize> {
        HyperLogLog::new(precision, fnv()).map(|e| e.register_count())
    }

    #[test]
    fn test_new_precision_64_bit_hash() {
        assert_eq!(
            HyperLogLog::new(65, WyHash64::default()).unwrap_err(),
            ConfigError::PrecisionExceedsHashWidth {
                precision: 65,
                hash_bits: 64
            }
        );
        assert!(HyperLogLog::new(24, WyHash64::default()).is_ok());
    }

    #[test_case(16 => 0.673)]
    #[test_case(32 => 0.697)]
    #[test_case(64 => 0.709)]
    fn test_alpha_special_cases(m: usize) -> f64 {
        alpha(m)
    }

    #[test]
    fn test_alpha_general() {
        let m = 1024.0;
        assert_eq!(alpha(1024), 0.7213 / (1.0 + 1.079 / m));
    }

    /// Hash function returning a fixed value, used to drive register updates directly.
    struct Fixed(u32);

    impl HashFunction for Fixed {
        type Output = u32;

        fn hash(&self, _value: &[u8]) -> u32 {
            self.0
        }
    }

    #[test_case(0x0000_0000, 4 => (0, 29))]
    #[test_case(0xf000_0000, 4 => (15, 29))]
    #[test_case(0x1800_0000, 4 => (1, 1))]
    #[test_case(0x1400_0000, 4 => (1, 2))]
    #[test_case(0x1000_0001, 4 => (1, 28))]
    #[test_case(0xffc0_0001, 10 => (1023, 22))]
    #[test_case(0xffc0_0000, 10 => (1023, 23))]
    #[test_case(0x8000_0000, 1 => (1, 32))]
    fn test_index_and_rank(h: u32, precision: u8) -> (usize, u8) {
        let e = HyperLogLog::new(precision, Fixed(h)).unwrap();
        e.index_and_rank(h)
    }

    struct FixedWide(u64);

    impl HashFunction for FixedWide {
        type Output = u64;

        fn hash(&self, _value: &[u8]) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_extreme_hashes_stay_in_bounds() {
        for precision in 1..=MAX_PRECISION {
            let mut narrow = HyperLogLog::new(precision, Fixed(u32::MAX)).unwrap();
            narrow.add(b"x");
            assert_eq!(narrow.index_and_rank(u32::MAX).0, narrow.register_count() - 1);
            assert_eq!(narrow.registers()[narrow.register_count() - 1], 1);

            let mut wide = HyperLogLog::new(precision, FixedWide(u64::MAX)).unwrap();
            wide.add(b"x");
            assert_eq!(wide.index_and_rank(u64::MAX).0, wide.register_count() - 1);
            assert_eq!(wide.zero_registers(), wide.register_count() - 1);
        }
    }

    #[test]
    fn test_rank_bounded_by_remaining_bits() {
        let mut e = HyperLogLog::new(4, Fixed(0)).unwrap();
        e.add(b"anything");
        assert_eq!(e.registers()[0], 32 - 4 + 1);
        assert!(e.registers().iter().all(|&r| r <= 29));
    }

    #[test]
    fn test_add_keeps_maximum_rank() {
        let mut e = HyperLogLog::new(4, Fixed(0x1400_0000)).unwrap();
        e.add(b"x");
        assert_eq!(e.registers()[1], 2);

        e.hasher = Fixed(0x1800_0000);
        e.add(b"x");
        assert_eq!(e.registers()[1], 2);

        e.hasher = Fixed(0x1000_0001);
        e.add(b"x");
        assert_eq!(e.registers()[1], 28);
    }

    #[test]
    fn test_empty_estimate_is_zero() {
        for precision in [4, 5, 6, 10, 14] {
            let e = HyperLogLog::new(precision, poly()).unwrap();
            assert_eq!(e.estimate(), 0.0);
        }
    }

    #[test]
    fn test_registers_monotonic() {
        let mut e = HyperLogLog::new(8, fnv()).unwrap();
        let mut previous = e.registers().to_vec();
        for i in 0..2000 {
            e.add(&sample_key(i));
            let current = e.registers();
            assert!(previous.iter().zip(current).all(|(old, new)| new >= old));
            let changed = previous.iter().zip(current).filter(|(old, new)| old != new).count();
            assert!(changed <= 1);
            previous = current.to_vec();
        }
    }

    #[test]
    fn test_repeated_value_idempotent() {
        let mut once = HyperLogLog::new(10, poly()).unwrap();
        once.add("repeated value");

        let mut many = HyperLogLog::new(10, poly()).unwrap();
        for _ in 0..100 {
            many.add("repeated value");
        }

        assert_eq!(once.registers(), many.registers());
        assert_eq!(once.estimate(), many.estimate());
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            let mut e = HyperLogLog::new(11, fnv()).unwrap();
            for i in 0..5000 {
                e.add(&sample_key(i));
            }
            e
        };
        assert_eq!(build().estimate(), build().estimate());
        assert_eq!(build().registers(), build().registers());
    }

    #[test]
    fn test_reset() {
        let mut e = HyperLogLog::new(10, fnv()).unwrap();
        for i in 0..5000 {
            e.add(&sample_key(i));
        }
        assert!(e.estimate() > 0.0);

        e.reset();
        let fresh = HyperLogLog::new(10, fnv()).unwrap();
        assert_eq!(e.registers(), fresh.registers());
        assert_eq!(e.estimate(), fresh.estimate());
        assert_eq!(e.estimate(), 0.0);
        assert_eq!(e.register_count(), 1024);
        assert_eq!(e.precision_bits(), 10);

        // still usable after reset
        e.add(&sample_key(0));
        assert_eq!(e.zero_registers(), 1023);
    }

    #[test]
    fn test_estimate_interleaved_with_add() {
        let mut e = HyperLogLog::new(12, WyHash64::new(1)).unwrap();
        let mut last = e.estimate();
        for i in 0..8000u64 {
            e.add(&i.to_le_bytes());
            if i % 1000 == 999 {
                let current = e.estimate();
                assert!(current >= last);
                last = current;
            }
        }
    }

    #[test]
    fn test_fnv1a_end_to_end() {
        let mut e = HyperLogLog::new(10, fnv()).unwrap();
        for i in 0..1000 {
            e.add(&sample_key(i));
        }
        let estimate = e.estimate();
        assert!((850.0..=1150.0).contains(&estimate), "estimate = {estimate}");
    }

    #[test]
    fn test_large_range_correction() {
        let mut e = HyperLogLog::new(4, Fixed(0)).unwrap();
        assert_eq!(e.estimate_with_large_range_correction(), e.estimate());

        // every register at rank 24: raw estimate between 2^32 / 30 and 2^32
        for idx in 0..16u32 {
            e.hasher = Fixed((idx << 28) | (1 << 4));
            e.add(b"x");
        }
        let raw = e.estimate();
        assert!(raw > 2f64.powi(32) / 30.0);
        let corrected = e.estimate_with_large_range_correction();
        assert!(corrected > raw);
    }

    #[test]
    fn test_relative_standard_error() {
        let e = HyperLogLog::new(12, poly()).unwrap();
        assert_eq!(e.relative_standard_error(), 1.04 / 64.0);
    }
}
