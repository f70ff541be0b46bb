//! Hash functions used by `HyperLogLog` to map values onto registers.
//!
//! Every hash function implements [`HashFunction`] and returns a fixed-width
//! unsigned integer described by [`HashWord`]. The width is a property of the
//! type, so the estimator knows at construction time how many bits remain
//! after the register index is taken.
//!
//! Provided implementations:
//! - [`PolyHash32`]: polynomial rolling hash with configurable base and seed.
//! - [`Fnv1a32`]: FNV-1a with configurable multiplier, seed XORed into the offset basis.
//! - [`WyHash64`]: seeded 64-bit `wyhash`.
//!
//! All arithmetic wraps; overflow is part of the mixing.

use std::fmt::Debug;

#[cfg(feature = "with_serde")]
use serde::{Deserialize, Serialize};

/// Standard 32-bit FNV offset basis
pub const FNV_OFFSET_BASIS_32: u32 = 2_166_136_261;
/// Standard 32-bit FNV prime
pub const FNV_PRIME_32: u32 = 16_777_619;
/// Seed used by the experiment harness for the 32-bit hashers
pub const DEFAULT_HASH_SEED: u32 = 0x9e37_79b1;
/// Base used by the experiment harness for `PolyHash32`
pub const DEFAULT_POLY_BASE: u32 = 12;
/// Base used by the experiment harness for `Fnv1a32`
pub const DEFAULT_FNV_BASE: u32 = 16;

mod private {
    pub trait Sealed {}
}

/// Fixed-width unsigned integer produced by a [`HashFunction`].
///
/// Implemented for `u32` and `u64` only. `high_bits(count)` is always below
/// `2^count`, which `HyperLogLog` relies on to index its registers.
///
/// ```compile_fail
/// use hll_stream::HashWord;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// struct Wide(u32);
///
/// impl HashWord for Wide {
///     const BITS: u32 = 32;
///     const ZERO: Self = Wide(0);
///
///     fn high_bits(self, _count: u32) -> usize {
///         1 << 20
///     }
///
///     fn shl_truncating(self, _count: u32) -> Self {
///         self
///     }
///
///     fn leading_zeros(self) -> u32 {
///         self.0.leading_zeros()
///     }
/// }
/// ```
pub trait HashWord: private::Sealed + Copy + Eq + Debug + Send + Sync + 'static {
    /// Width of the hash in bits
    const BITS: u32;
    /// All-zero value
    const ZERO: Self;

    /// Return the top `count` bits as an index, `count` in `1..=BITS`.
    fn high_bits(self, count: u32) -> usize;

    /// Shift left by `count`, discarding bits shifted past the width.
    fn shl_truncating(self, count: u32) -> Self;

    /// Number of leading zero bits
    fn leading_zeros(self) -> u32;
}

macro_rules! impl_hash_word {
    ($($t:ty),*) => {
        $(
            impl private::Sealed for $t {}

            impl HashWord for $t {
                const BITS: u32 = <$t>::BITS;
                const ZERO: Self = 0;

                #[inline]
                fn high_bits(self, count: u32) -> usize {
                    self.checked_shr(Self::BITS - count).unwrap_or(0) as usize
                }

                #[inline]
                fn shl_truncating(self, count: u32) -> Self {
                    self.checked_shl(count).unwrap_or(0)
                }

                #[inline]
                fn leading_zeros(self) -> u32 {
                    <$t>::leading_zeros(self)
                }
            }
        )*
    };
}

impl_hash_word!(u32, u64);

/// A pure mapping from a byte sequence to a fixed-width unsigned integer.
///
/// Implementations must be deterministic: the same input and construction
/// parameters always produce the same output.
pub trait HashFunction {
    /// Hash word type, `u32` or `u64`
    type Output: HashWord;

    /// Hash `value` into a word of `Output::BITS` bits
    fn hash(&self, value: &[u8]) -> Self::Output;
}

impl<H: HashFunction + ?Sized> HashFunction for &H {
    type Output = H::Output;

    #[inline]
    fn hash(&self, value: &[u8]) -> Self::Output {
        (**self).hash(value)
    }
}

/// Polynomial rolling hash: `state = state * base + byte`, starting from `seed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(Serialize, Deserialize))]
pub struct PolyHash32 {
    pub base: u32,
    pub seed: u32,
}

impl PolyHash32 {
    #[inline]
    pub const fn new(base: u32, seed: u32) -> Self {
        Self { base, seed }
    }
}

impl Default for PolyHash32 {
    fn default() -> Self {
        Self::new(DEFAULT_POLY_BASE, DEFAULT_HASH_SEED)
    }
}

impl HashFunction for PolyHash32 {
    type Output = u32;

    #[inline]
    fn hash(&self, value: &[u8]) -> u32 {
        value.iter().fold(self.seed, |state, &b| {
            state.wrapping_mul(self.base).wrapping_add(u32::from(b))
        })
    }
}

/// FNV-1a with configurable multiplier: `state = (state ^ byte) * base`,
/// starting from `FNV_OFFSET_BASIS_32 ^ seed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(Serialize, Deserialize))]
pub struct Fnv1a32 {
    pub base: u32,
    pub seed: u32,
}

impl Fnv1a32 {
    #[inline]
    pub const fn new(base: u32, seed: u32) -> Self {
        Self { base, seed }
    }
}

impl Default for Fnv1a32 {
    /// Standard FNV-1a: prime multiplier and unmodified offset basis
    fn default() -> Self {
        Self::new(FNV_PRIME_32, 0)
    }
}

impl HashFunction for Fnv1a32 {
    type Output = u32;

    #[inline]
    fn hash(&self, value: &[u8]) -> u32 {
        value.iter().fold(FNV_OFFSET_BASIS_32 ^ self.seed, |state, &b| {
            (state ^ u32::from(b)).wrapping_mul(self.base)
        })
    }
}

/// Seeded 64-bit `wyhash`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(Serialize, Deserialize))]
pub struct WyHash64 {
    pub seed: u64,
}

impl WyHash64 {
    #[inline]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl HashFunction for WyHash64 {
    type Output = u64;

    #[inline]
    fn hash(&self, value: &[u8]) -> u64 {
        wyhash::wyhash(value, self.seed)
    }
}
