use thiserror::Error;

use crate::Registry;

/// Errors that could occur while configuring a [`Registry`].
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    /// No quantiles were given.
    #[error("at least one quantile must be configured")]
    EmptyQuantiles,

    /// A quantile was NaN or infinite.
    #[error("quantile must be a finite number, got {0}")]
    InvalidQuantile(f64),

    /// A bucket count of zero was given.
    #[error("bucket count must be non-zero")]
    ZeroBuckets,

    /// A decay time of zero was given.
    #[error("decay time must be non-zero")]
    ZeroDecayTime,

    /// The range minimum was not strictly below the range maximum.
    #[error("invalid range: minimum {min} must be less than maximum {max}")]
    InvalidRange {
        /// Requested range minimum.
        min: f64,

        /// Requested range maximum.
        max: f64,
    },
}

/// Error returned when a root registry has already been installed.
///
/// The registry that could not be installed is handed back.
#[derive(Debug, Error)]
#[error("a root registry has already been installed")]
pub struct SetRootError(pub Registry);

impl SetRootError {
    /// Gets the registry that failed to be installed.
    pub fn into_inner(self) -> Registry {
        self.0
    }
}
