//! Error taxonomy for the tidal-tensor engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TidalError>;

/// Errors raised by Hessian construction, eigensolves and configuration.
///
/// Every variant is fatal to the requested computation: preconditions are
/// checked before work starts and numeric failures abort the whole call.
#[derive(Debug, Error)]
pub enum TidalError {
    /// Unallocated, empty, mismatched or wrong-domain field input.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A scalar parameter outside its admissible range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The dense symmetric decomposition failed at a cell.
    #[error("numeric failure at cell {cell}: {reason}")]
    NumericFailure { cell: usize, reason: String },

    /// Semantically invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The rayon worker pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub(crate) fn invalid_grid(message: impl Into<String>) -> TidalError {
    TidalError::InvalidGrid(message.into())
}
