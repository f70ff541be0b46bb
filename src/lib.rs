//! `hll-stream` is a Rust crate designed to estimate the number of distinct elements in a stream
//! with the HyperLogLog algorithm, using a fixed register array and a pluggable hash function.
//!
//! ```
//! use hll_stream::hash::{Fnv1a32, DEFAULT_FNV_BASE, DEFAULT_HASH_SEED};
//! use hll_stream::HyperLogLog;
//!
//! let mut hll = HyperLogLog::new(12, Fnv1a32::new(DEFAULT_FNV_BASE, DEFAULT_HASH_SEED)).unwrap();
//! assert_eq!(hll.estimate(), 0.0);
//! hll.add("first");
//! hll.add(b"second");
//! assert!(hll.estimate() > 0.0);
//! ```
pub mod error;
#[cfg(feature = "harness")]
pub mod experiment;
pub mod hash;
pub mod hyperloglog;
pub mod sketch;
#[cfg(feature = "harness")]
pub mod stream;

pub use error::{ConfigError, UnknownHasher};
pub use hash::{Fnv1a32, HashFunction, HashWord, PolyHash32, WyHash64};
pub use hyperloglog::{HyperLogLog, MAX_PRECISION};
pub use sketch::{AnyEstimator, CardinalitySketch, HasherKind};
