use ndarray::Array1;
use uom::si::{f64::Time, time::second};

use crate::ModelError;

/// Values sampled at every point of a [`TimeGrid`].
pub type TimeSeries = Array1<f64>;

/// Slack applied when counting steps so an end time that is an exact multiple
/// of the step survives floating-point division.
const STEP_COUNT_SLACK: f64 = 1e-9;

/// Largest number of points a grid may hold.
const MAX_GRID_POINTS: usize = 50_000_000;

/// Uniform time axis starting at zero.
///
/// Points are `0, dt, 2·dt, …, n·dt` where `n·dt` is the largest multiple of
/// the step that does not exceed the end time.
/// The end time itself is included when it lands on a step.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    step: f64,
    times: Array1<f64>,
}

impl TimeGrid {
    /// Creates a grid from an end time and a step.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfiguration`] if the step is not
    /// strictly positive, the end time is negative or non-finite, or the grid
    /// would hold more than fifty million points.
    pub fn new(time_end: Time, time_step: Time) -> Result<Self, ModelError> {
        Self::from_seconds(time_end.get::<second>(), time_step.get::<second>())
    }

    /// Creates a grid from an end time and a step given in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfiguration`] under the same conditions
    /// as [`TimeGrid::new`].
    pub fn from_seconds(time_end: f64, time_step: f64) -> Result<Self, ModelError> {
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(ModelError::invalid(format!(
                "time step must be finite and strictly positive, got {time_step} s"
            )));
        }
        if !time_end.is_finite() || time_end < 0.0 {
            return Err(ModelError::invalid(format!(
                "time end must be finite and non-negative, got {time_end} s"
            )));
        }

        let ratio = (time_end / time_step + STEP_COUNT_SLACK).floor();
        #[allow(clippy::cast_precision_loss)]
        let limit = MAX_GRID_POINTS as f64;
        if !ratio.is_finite() || ratio >= limit {
            return Err(ModelError::invalid(format!(
                "time end {time_end} s at step {time_step} s exceeds {MAX_GRID_POINTS} grid points"
            )));
        }

        // `ratio` is a non-negative integer below `MAX_GRID_POINTS`.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = ratio as usize;

        #[allow(clippy::cast_precision_loss)]
        let times = Array1::from_shape_fn(steps + 1, |i| i as f64 * time_step);

        Ok(Self {
            step: time_step,
            times,
        })
    }

    /// Returns the number of grid points (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// A grid always contains `t = 0`, so it is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the step, in seconds.
    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Returns the last grid time, in seconds.
    #[must_use]
    pub fn last(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Returns the grid times, in seconds.
    #[must_use]
    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    /// Returns a series of zeros aligned with this grid.
    #[must_use]
    pub fn zeros(&self) -> TimeSeries {
        Array1::zeros(self.len())
    }

    /// Returns a series holding `value` at every grid point.
    #[must_use]
    pub fn constant(&self, value: f64) -> TimeSeries {
        Array1::from_elem(self.len(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn includes_end_on_exact_multiple() {
        let grid = TimeGrid::from_seconds(10.0, 2.0).unwrap();
        assert_eq!(grid.len(), 6);
        assert_relative_eq!(grid.last(), 10.0);
        assert_relative_eq!(grid.times()[1], 2.0);
    }

    #[test]
    fn stops_before_end_between_steps() {
        let grid = TimeGrid::from_seconds(10.0, 3.0).unwrap();
        assert_eq!(grid.len(), 4);
        assert_relative_eq!(grid.last(), 9.0);
    }

    #[test]
    fn survives_inexact_step_division() {
        // 0.3 / 0.1 is slightly below 3 in binary floating point.
        let grid = TimeGrid::from_seconds(0.3, 0.1).unwrap();
        assert_eq!(grid.len(), 4);
        assert_relative_eq!(grid.last(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn zero_end_is_a_single_point() {
        let grid = TimeGrid::from_seconds(0.0, 1.0).unwrap();
        assert_eq!(grid.len(), 1);
        assert_relative_eq!(grid.last(), 0.0);
    }

    #[test]
    fn one_hour_at_one_second() {
        let grid = TimeGrid::new(Time::new::<second>(3600.0), Time::new::<second>(1.0)).unwrap();
        assert_eq!(grid.len(), 3601);
        assert_relative_eq!(grid.step(), 1.0);
    }

    #[test]
    fn rejects_bad_time_controls() {
        for (end, step) in [
            (10.0, 0.0),
            (10.0, -1.0),
            (-1.0, 1.0),
            (f64::NAN, 1.0),
            (10.0, f64::INFINITY),
        ] {
            let result = TimeGrid::from_seconds(end, step);
            assert!(
                matches!(result, Err(ModelError::InvalidConfiguration { .. })),
                "end = {end}, step = {step} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_unrepresentable_horizon() {
        #[allow(clippy::cast_precision_loss)]
        let just_over = MAX_GRID_POINTS as f64;
        for (end, step) in [(1e30, 1.0), (f64::MAX, 1e-300), (just_over, 1.0)] {
            let result = TimeGrid::from_seconds(end, step);
            assert!(
                matches!(result, Err(ModelError::InvalidConfiguration { .. })),
                "end = {end}, step = {step} should be rejected"
            );
        }
    }
}
