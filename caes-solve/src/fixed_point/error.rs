use caes_model::ModelError;
use thiserror::Error;

use super::{History, Phase};

/// Errors that can occur during fixed-point solving.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("model evaluation failed")]
    Model(#[from] ModelError),

    #[error(
        "{phase} phase did not converge within {max_iters} iterations (last delta {last_delta})"
    )]
    ConvergenceFailure {
        phase: Phase,
        max_iters: usize,
        last_delta: f64,
        /// Deltas of every iteration run before giving up.
        history: History,
    },
}
