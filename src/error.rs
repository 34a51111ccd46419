//! Errors in the library.

use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum SimError {
    /// The surrogate cannot be trained without labeled points.
    #[error("cannot fit the signal model on an empty source set")]
    EmptySources,

    /// The environment was used before its first successful reset.
    #[error("signal model is not fitted; call reset() first")]
    NotFitted,

    /// `step` received the wrong number of actions.
    #[error("expected {expected} actions, got {got}")]
    ActionCount { expected: usize, got: usize },

    /// The kernel matrix could not be factorized at any jitter level.
    #[error("covariance matrix is not positive definite")]
    NotPositiveDefinite,
}
