//! Two-phase fixed-point iteration for a self-consistent leakage rate.
//!
//! Leakage depends on pressure and temperature, which in turn depend on how
//! much mass has leaked.
//! Starting from the leakage of a cavern that has not leaked yet, the solver
//! repeatedly replaces the estimate `ml` with `leakage(ml)`:
//!
//! 1. [`Phase::Basic`] evaluates temperature without leakage in the energy balance.
//! 2. [`Phase::Adjustment`] continues from there with leakage included.
//!
//! Each phase stops once the [delta](convergence_delta) between successive
//! estimates drops below [`Config::delta_tol`], and fails with
//! [`Error::ConvergenceFailure`] if its iteration limit is reached first.
//! The update is plain substitution without relaxation, so oscillating
//! estimates are reported rather than damped.

mod config;
mod error;
mod phase;
mod solution;

pub use config::Config;
pub use error::Error;
pub use phase::Phase;
pub use solution::{History, Solution, Status};

use caes_model::{SimulationState, StateEquations, TimeSeries};
use log::{debug, info, warn};
use ndarray::Zip;

use crate::Observer;

/// Scale applied to the mean absolute change between estimates.
const DELTA_SCALE: f64 = 100.0;

/// Control actions supported by the fixed-point solver.
pub enum Action {
    /// Stop the solver after accepting the current candidate.
    StopEarly,
}

/// Iteration event emitted by the fixed-point solver.
pub struct Event<'a> {
    /// Phase being iterated.
    pub phase: Phase,
    /// Iteration counter (1-based within the phase).
    pub iter: usize,
    /// Delta between the candidate and the previous estimate.
    pub delta: f64,
    /// Estimate the candidate was computed from.
    pub previous: &'a TimeSeries,
    /// Leakage recomputed from the previous estimate.
    pub candidate: &'a TimeSeries,
}

/// Returns `mean(|candidate − previous|) · 100`.
///
/// Both series must share a time grid.
#[must_use]
pub fn convergence_delta(candidate: &TimeSeries, previous: &TimeSeries) -> f64 {
    let total = Zip::from(candidate)
        .and(previous)
        .fold(0.0, |acc, &c, &p| acc + (c - p).abs());

    #[allow(clippy::cast_precision_loss)]
    let mean = total / candidate.len() as f64;
    mean * DELTA_SCALE
}

/// Solves for the leakage rate consistent with the cavern state.
/// Observers see every iteration of both phases.
///
/// # Errors
///
/// Returns an error if the config is invalid, a model evaluation fails, or a
/// phase exhausts its iteration limit.
pub fn solve<Obs>(
    equations: &StateEquations<'_>,
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    Obs: Observer,
{
    config
        .validate()
        .map_err(|reason| Error::InvalidConfig { reason })?;

    let mut leakage = equations.initial_state()?.leakage;
    let mut history = History::default();

    for phase in Phase::ALL {
        let flow = iterate(
            equations,
            config,
            phase,
            &mut leakage,
            &mut history,
            &mut observer,
        )?;

        if let Flow::Stopped = flow {
            return finish(equations, leakage, history, phase, Status::StoppedByObserver);
        }
    }

    info!(
        "leakage converged after {} basic and {} adjustment iterations",
        history.basic.len(),
        history.adjustment.len()
    );
    finish(
        equations,
        leakage,
        history,
        Phase::Adjustment,
        Status::Converged,
    )
}

/// Runs the fixed-point solver without observation.
///
/// # Errors
///
/// Returns an error if the config is invalid, a model evaluation fails, or a
/// phase exhausts its iteration limit.
pub fn solve_unobserved(
    equations: &StateEquations<'_>,
    config: &Config,
) -> Result<Solution, Error> {
    solve(equations, config, ())
}

enum Flow {
    Converged,
    Stopped,
}

fn iterate<Obs>(
    equations: &StateEquations<'_>,
    config: &Config,
    phase: Phase,
    leakage: &mut TimeSeries,
    history: &mut History,
    observer: &mut Obs,
) -> Result<Flow, Error>
where
    Obs: Observer,
{
    let max_iters = match phase {
        Phase::Basic => config.basic_max_iters,
        Phase::Adjustment => config.adjustment_max_iters,
    };
    let feedback = phase.feedback();

    info!("starting {phase} iteration");

    let mut last_delta = f64::NAN;
    for iter in 1..=max_iters {
        let candidate = equations.leakage(leakage, feedback)?;
        let delta = convergence_delta(&candidate, leakage);
        history.record(phase, delta);
        last_delta = delta;

        debug!("{phase} iteration {iter}: delta = {delta:.6}");

        let event = Event {
            phase,
            iter,
            delta,
            previous: leakage,
            candidate: &candidate,
        };
        let action = observer.observe(&event);

        *leakage = candidate;

        if let Some(Action::StopEarly) = action {
            warn!("{phase} iteration {iter} stopped by observer at delta = {delta:.6}");
            return Ok(Flow::Stopped);
        }

        if delta < config.delta_tol {
            info!("{phase} iteration converged in {iter} iterations (delta = {delta:.6})");
            return Ok(Flow::Converged);
        }
    }

    Err(Error::ConvergenceFailure {
        phase,
        max_iters,
        last_delta,
        history: history.clone(),
    })
}

fn finish(
    equations: &StateEquations<'_>,
    leakage: TimeSeries,
    history: History,
    phase: Phase,
    status: Status,
) -> Result<Solution, Error> {
    let SimulationState {
        density,
        temperature,
        pressure,
        ..
    } = equations.state(&leakage, phase.feedback())?;

    Ok(Solution {
        status,
        phase,
        state: SimulationState {
            density,
            temperature,
            pressure,
            leakage,
        },
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use caes_model::{Feedback, ModelError, Parameters, ParametersConfig};
    use uom::si::{
        area::square_meter,
        f64::{Area, HeatTransfer, MassDensity, Time},
        heat_transfer::watt_per_square_meter_kelvin,
        mass_density::kilogram_per_cubic_meter,
        time::second,
    };

    /// One hour at a ten second step with the Kamioka constants.
    fn one_hour() -> ParametersConfig {
        ParametersConfig {
            time_step: Time::new::<second>(10.0),
            time_end: Time::new::<second>(3600.0),
            ..ParametersConfig::kamioka()
        }
    }

    /// Equations for a constant injection rate and no extraction.
    fn injecting(params: &Parameters, rate: f64) -> StateEquations<'_> {
        let grid = params.time_grid();
        StateEquations::new(params, grid.constant(rate), grid.zeros()).unwrap()
    }

    #[test]
    fn converges_for_steady_injection() {
        let params = one_hour().build().unwrap();
        let eq = injecting(&params, 1.0);

        let solution = solve_unobserved(&eq, &Config::default()).expect("should converge");

        assert_eq!(solution.status, Status::Converged);
        assert_eq!(solution.phase, Phase::Adjustment);
        assert_eq!(solution.history.basic.len(), 2);
        assert_eq!(solution.history.adjustment.len(), 1);
        assert_eq!(solution.history.iters(), 3);
        assert!(solution.history.basic[0] >= 1.0);
        assert!(solution.history.adjustment[0] < 1.0);

        let state = &solution.state;
        let rho0 = 1.2754;
        assert!(state.density.iter().all(|&rho| rho >= rho0));
        assert!(state.pressure.iter().all(|&p| p >= 1.0133e5));
        assert!(state.leakage.iter().all(|&ml| ml > 0.0));
        assert!(state.leakage[360] < 1.0, "leakage must stay below injection");
    }

    #[test]
    fn solution_is_consistent_with_its_leakage() {
        let params = one_hour().build().unwrap();
        let eq = injecting(&params, 1.0);

        let solution = solve_unobserved(&eq, &Config::default()).unwrap();
        let state = &solution.state;

        let recomputed = eq.state(&state.leakage, Feedback::WithLeakage).unwrap();
        assert_eq!(recomputed.density, state.density);
        assert_eq!(recomputed.temperature, state.temperature);
        assert_eq!(recomputed.pressure, state.pressure);

        let delta = convergence_delta(&recomputed.leakage, &state.leakage);
        assert!(delta < 1.0, "fixed point drifted by {delta}");
    }

    #[test]
    fn basic_phase_estimate_is_a_fixed_point() {
        let params = one_hour().build().unwrap();
        let eq = injecting(&params, 1.0);

        let stop_when_basic_converges = |event: &Event<'_>| {
            (event.phase == Phase::Basic && event.delta < 1.0).then_some(Action::StopEarly)
        };
        let solution = solve(&eq, &Config::default(), stop_when_basic_converges).unwrap();
        assert_eq!(solution.status, Status::StoppedByObserver);
        assert_eq!(solution.phase, Phase::Basic);

        let ml = &solution.state.leakage;
        let again = eq.leakage(ml, Feedback::WithoutLeakage).unwrap();
        assert!(convergence_delta(&again, ml) < 1.0);
    }

    #[test]
    fn step_injection_fills_the_cavern_until_leakage_catches_up() {
        let params = ParametersConfig {
            time_end: Time::new::<second>(3600.0),
            ..ParametersConfig::kamioka()
        }
        .build()
        .unwrap();
        let eq = injecting(&params, 10.0);

        let solution = solve_unobserved(&eq, &Config::default()).expect("should converge");
        assert_eq!(solution.status, Status::Converged);

        let SimulationState {
            density, leakage, ..
        } = &solution.state;
        assert_relative_eq!(density[0], 1.2754 + (10.0 - leakage[0]) / 222.75, epsilon = 1e-9);
        for i in 1..density.len() {
            if leakage[i] < 10.0 {
                assert!(density[i] >= density[i - 1], "density fell at index {i}");
            }
        }
    }

    #[test]
    fn oscillating_estimates_hit_the_iteration_limit() {
        // A thousandfold permeability makes each update overshoot the last.
        let params = ParametersConfig {
            rock_permeability: Area::new::<square_meter>(5e-11),
            ..one_hour()
        }
        .build()
        .unwrap();
        let eq = injecting(&params, 1.0);
        let config = Config {
            basic_max_iters: 20,
            ..Config::default()
        };

        let result = solve_unobserved(&eq, &config);

        match result {
            Err(Error::ConvergenceFailure {
                phase,
                max_iters,
                last_delta,
                history,
            }) => {
                assert_eq!(phase, Phase::Basic);
                assert_eq!(max_iters, 20);
                assert_eq!(history.basic.len(), 20);
                assert!(history.adjustment.is_empty());
                assert!(last_delta >= 1.0);
                assert_relative_eq!(last_delta, history.basic[19]);
            }
            other => panic!("expected a convergence failure, got {other:?}"),
        }
    }

    #[test]
    fn no_flow_converges_immediately() {
        let rho0 = 1.0133e5 / (286.7 * 293.0) * 0.99;
        let params = ParametersConfig {
            initial_density: MassDensity::new::<kilogram_per_cubic_meter>(rho0),
            ..one_hour()
        }
        .build()
        .unwrap();
        let eq = injecting(&params, 0.0);

        let solution = solve_unobserved(&eq, &Config::default()).unwrap();

        assert_eq!(solution.history.basic, vec![0.0]);
        assert_eq!(solution.history.adjustment, vec![0.0]);
        assert!(solution.state.leakage.iter().all(|&ml| ml == 0.0));
    }

    #[test]
    fn observer_can_stop_iteration() {
        let params = one_hour().build().unwrap();
        let eq = injecting(&params, 1.0);

        let mut calls = 0usize;
        let observer = |event: &Event<'_>| {
            calls += 1;
            assert_eq!(event.previous.len(), event.candidate.len());
            Some(Action::StopEarly)
        };

        let solution = solve(&eq, &Config::default(), observer).expect("should stop cleanly");

        assert_eq!(solution.status, Status::StoppedByObserver);
        assert_eq!(solution.phase, Phase::Basic);
        assert_eq!(solution.history.iters(), 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn observer_sees_phases_in_order() {
        let params = one_hour().build().unwrap();
        let eq = injecting(&params, 1.0);

        let mut seen = Vec::new();
        let observer = |event: &Event<'_>| {
            seen.push((event.phase, event.iter));
            None
        };
        solve(&eq, &Config::default(), observer).unwrap();

        assert_eq!(
            seen,
            vec![
                (Phase::Basic, 1),
                (Phase::Basic, 2),
                (Phase::Adjustment, 1)
            ]
        );
    }

    #[test]
    fn errors_on_invalid_config() {
        let params = one_hour().build().unwrap();
        let eq = injecting(&params, 1.0);
        let config = Config {
            delta_tol: -1.0,
            ..Config::default()
        };

        let result = solve_unobserved(&eq, &config);

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn model_failures_propagate() {
        let params = ParametersConfig {
            heat_transfer_coefficient: HeatTransfer::new::<watt_per_square_meter_kelvin>(0.0),
            ..one_hour()
        }
        .build()
        .unwrap();
        let eq = injecting(&params, 0.0);

        let result = solve_unobserved(&eq, &Config::default());

        assert!(matches!(
            result,
            Err(Error::Model(ModelError::NumericalInstability { .. }))
        ));
    }

    #[test]
    fn delta_is_scaled_mean_absolute_change() {
        let previous = ndarray::array![1.0, 2.0, 3.0, 4.0];
        let candidate = ndarray::array![1.5, 1.5, 3.0, 5.0];

        assert_relative_eq!(convergence_delta(&candidate, &previous), 50.0);
    }
}
