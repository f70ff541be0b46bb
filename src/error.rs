//! Error types returned when an estimator is built with invalid parameters.

use thiserror::Error;

/// Result type alias for estimator construction.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors detected when constructing a `HyperLogLog`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Precision of zero would leave a single register and no index bits.
    #[error("precision must be at least 1")]
    PrecisionTooSmall,
    /// Register index cannot take more bits than the hash provides.
    #[error("precision {precision} exceeds hash width of {hash_bits} bits")]
    PrecisionExceedsHashWidth { precision: u8, hash_bits: u32 },
    /// Register array would be larger than the supported maximum.
    #[error("precision {precision} exceeds maximum supported precision {max}")]
    PrecisionTooLarge { precision: u8, max: u8 },
}

/// Hash function name that does not match any `HasherKind`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hash function `{0}`, expected one of: PolyHash32, Fnv1a32, WyHash64")]
pub struct UnknownHasher(pub String);

/// Errors raised while running experiments and writing reports.
#[cfg(feature = "harness")]
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write report {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
