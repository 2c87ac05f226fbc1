use std::{io, path::PathBuf};

use ninterp::error::{InterpolateError, ValidateError};
use thiserror::Error;

/// Errors that may occur when configuring or evaluating the cavern model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A parameter, time control, or input series is outside the model's valid domain.
    ///
    /// For example, a non-positive time step or a reservoir radius that does
    /// not exceed the cavern radius.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// An intermediate or final quantity became non-finite or degenerate.
    ///
    /// `index` is the position on the time grid where the value was produced.
    #[error("numerical instability in {quantity} at grid index {index}: {value}")]
    NumericalInstability {
        quantity: &'static str,
        index: usize,
        value: f64,
    },

    /// A schedule file could not be read.
    #[error("failed to read schedule `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A schedule file contains a malformed row.
    #[error("malformed schedule `{}` at line {line}: {reason}", path.display())]
    ParseSchedule {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The schedule interpolator rejected its rows.
    #[error("invalid schedule data: {0}")]
    ScheduleData(#[from] ValidateError),

    /// The schedule interpolator failed at a grid time.
    #[error("schedule interpolation failed: {0}")]
    Interpolation(#[from] InterpolateError),
}

impl ModelError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
