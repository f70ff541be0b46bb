//! Common estimator interface and a statically dispatched estimator whose
//! hash function is picked at runtime.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use enum_dispatch::enum_dispatch;

#[cfg(feature = "with_serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, UnknownHasher};
use crate::hash::{Fnv1a32, PolyHash32, WyHash64, DEFAULT_FNV_BASE, DEFAULT_POLY_BASE};
use crate::hyperloglog::HyperLogLog;

/// `HyperLogLog` estimators over every provided hash function
#[derive(Clone, Debug)]
#[enum_dispatch]
pub enum AnyEstimator {
    Poly32(HyperLogLog<PolyHash32>),
    Fnv1a32(HyperLogLog<Fnv1a32>),
    WyHash64(HyperLogLog<WyHash64>),
}

/// Operations shared by all cardinality estimators.
#[enum_dispatch(AnyEstimator)]
pub trait CardinalitySketch {
    fn add(&mut self, value: &[u8]);
    fn estimate(&self) -> f64;
    fn reset(&mut self);
    fn register_count(&self) -> usize;
    fn precision_bits(&self) -> u8;
}

impl<H: crate::hash::HashFunction> CardinalitySketch for HyperLogLog<H> {
    #[inline]
    fn add(&mut self, value: &[u8]) {
        HyperLogLog::add(self, value)
    }

    #[inline]
    fn estimate(&self) -> f64 {
        HyperLogLog::estimate(self)
    }

    #[inline]
    fn reset(&mut self) {
        HyperLogLog::reset(self)
    }

    #[inline]
    fn register_count(&self) -> usize {
        HyperLogLog::register_count(self)
    }

    #[inline]
    fn precision_bits(&self) -> u8 {
        HyperLogLog::precision_bits(self)
    }
}

/// Hash function families selectable at runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with_serde", derive(Serialize, Deserialize))]
pub enum HasherKind {
    Poly32,
    Fnv1a32,
    WyHash64,
}

impl HasherKind {
    pub const ALL: [HasherKind; 3] = [HasherKind::Poly32, HasherKind::Fnv1a32, HasherKind::WyHash64];

    /// Name used in reports and file names
    pub fn name(&self) -> &'static str {
        match self {
            HasherKind::Poly32 => "PolyHash32",
            HasherKind::Fnv1a32 => "Fnv1a32",
            HasherKind::WyHash64 => "WyHash64",
        }
    }

    /// Default multiplicative base, `None` for hashers without one
    pub fn default_base(&self) -> Option<u32> {
        match self {
            HasherKind::Poly32 => Some(DEFAULT_POLY_BASE),
            HasherKind::Fnv1a32 => Some(DEFAULT_FNV_BASE),
            HasherKind::WyHash64 => None,
        }
    }
}

impl Display for HasherKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HasherKind {
    type Err = UnknownHasher;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HasherKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownHasher(s.to_string()))
    }
}

impl AnyEstimator {
    /// Create estimator for `kind` with its default base and given `seed`
    pub fn new(kind: HasherKind, precision: u8, seed: u32) -> Result<Self> {
        Self::with_base(kind, precision, kind.default_base().unwrap_or(0), seed)
    }

    /// Create estimator for `kind` with explicit `base`; `WyHash64` ignores it
    pub fn with_base(kind: HasherKind, precision: u8, base: u32, seed: u32) -> Result<Self> {
        Ok(match kind {
            HasherKind::Poly32 => HyperLogLog::new(precision, PolyHash32::new(base, seed))?.into(),
            HasherKind::Fnv1a32 => HyperLogLog::new(precision, Fnv1a32::new(base, seed))?.into(),
            HasherKind::WyHash64 => {
                HyperLogLog::new(precision, WyHash64::new(u64::from(seed)))?.into()
            }
        })
    }

    pub fn kind(&self) -> HasherKind {
        match self {
            AnyEstimator::Poly32(_) => HasherKind::Poly32,
            AnyEstimator::Fnv1a32(_) => HasherKind::Fnv1a32,
            AnyEstimator::WyHash64(_) => HasherKind::WyHash64,
        }
    }
}
