//! Mass-rate schedules sampled onto the time grid.
//!
//! A schedule file holds one `time;rate` row per line, sorted by time, with
//! time in seconds and rate in kg/s.
//! Blank lines and lines starting with `#` are skipped.
//! Rates in the file are non-negative magnitudes for both directions.
//! Extraction rates are negated when parsed.

use std::{fs, path::Path};

use ndarray::Array1;
use ninterp::{
    interpolator::Extrapolate,
    prelude::{Interp1DOwned, Interpolator},
    strategy::Linear,
};

use crate::{ModelError, TimeGrid, TimeSeries};

/// Direction of the mass flow described by a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Mass entering the cavern; rates are kept as they are.
    Injection,
    /// Mass leaving the cavern; rates are negated.
    Extraction,
}

impl Sign {
    fn apply(self, magnitude: f64) -> f64 {
        match self {
            Sign::Injection => magnitude,
            Sign::Extraction => -magnitude,
        }
    }
}

/// Irregular `(time, rate)` samples of one flow direction.
///
/// Sampling onto a [`TimeGrid`] interpolates linearly between rows and holds
/// the first or last rate outside the sampled range.
#[derive(Debug, Clone)]
pub struct ScheduleSampler {
    sign: Sign,
    rows: usize,
    profile: Profile,
}

#[derive(Debug, Clone)]
enum Profile {
    /// A single row holds its rate over the whole grid.
    Constant(f64),
    Linear(Interp1DOwned<f64, Linear>),
}

impl ScheduleSampler {
    /// Reads a schedule file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Io`] if the file cannot be read, or
    /// [`ModelError::ParseSchedule`] if a row is malformed, a rate is negative,
    /// times are not strictly increasing, or the file has no rows, or
    /// [`ModelError::ScheduleData`] if the interpolator rejects the rows.
    pub fn from_path(path: impl AsRef<Path>, sign: Sign) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, sign, path)
    }

    /// Parses schedule text, using `origin` in error messages.
    ///
    /// # Errors
    ///
    /// See [`ScheduleSampler::from_path`].
    pub fn parse(content: &str, sign: Sign, origin: &Path) -> Result<Self, ModelError> {
        let malformed = |line: usize, reason: String| ModelError::ParseSchedule {
            path: origin.to_path_buf(),
            line,
            reason,
        };

        let mut times = Vec::new();
        let mut rates = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line = index + 1;
            let row = raw.trim();
            if row.is_empty() || row.starts_with('#') {
                continue;
            }

            let mut fields = row.split(';').map(str::trim);
            let (Some(time), Some(rate), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(malformed(line, format!("expected `time;rate`, got `{row}`")));
            };

            let time: f64 = time
                .parse()
                .map_err(|err| malformed(line, format!("bad time `{time}`: {err}")))?;
            let rate: f64 = rate
                .parse()
                .map_err(|err| malformed(line, format!("bad rate `{rate}`: {err}")))?;

            if !time.is_finite() || !rate.is_finite() {
                return Err(malformed(line, "values must be finite".into()));
            }
            if rate < 0.0 {
                return Err(malformed(
                    line,
                    format!("rate must be a non-negative magnitude, got {rate}"),
                ));
            }
            if let Some(&previous) = times.last() {
                if time <= previous {
                    return Err(malformed(
                        line,
                        format!("time {time} does not follow {previous}"),
                    ));
                }
            }

            times.push(time);
            rates.push(sign.apply(rate));
        }

        let rows = times.len();
        let profile = match rows {
            0 => return Err(malformed(0, "schedule has no rows".into())),
            1 => Profile::Constant(rates[0]),
            _ => Profile::Linear(Interp1DOwned::new(
                Array1::from(times),
                Array1::from(rates),
                Linear,
                Extrapolate::Clamp,
            )?),
        };

        Ok(Self {
            sign,
            rows,
            profile,
        })
    }

    /// Returns the flow direction.
    #[must_use]
    pub fn sign(&self) -> Sign {
        self.sign
    }

    /// Returns the number of schedule rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Always `false`; a sampler holds at least one row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Samples the signed rate at every grid time.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Interpolation`] if the interpolator fails at a
    /// grid time.
    pub fn sample(&self, grid: &TimeGrid) -> Result<TimeSeries, ModelError> {
        let interp = match &self.profile {
            Profile::Constant(rate) => return Ok(grid.constant(*rate)),
            Profile::Linear(interp) => interp,
        };

        let mut series = grid.zeros();
        for (value, &t) in series.iter_mut().zip(grid.times()) {
            *value = interp.interpolate(&[t])?;
        }
        Ok(series)
    }
}
