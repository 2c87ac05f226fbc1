use caes_model::SimulationState;

use super::Phase;

/// Indicates how the solver finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Both phases converged according to the configured tolerance.
    Converged,
    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// Convergence deltas recorded per phase, one per iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub basic: Vec<f64>,
    pub adjustment: Vec<f64>,
}

impl History {
    /// Returns the deltas recorded for a phase.
    #[must_use]
    pub fn phase(&self, phase: Phase) -> &[f64] {
        match phase {
            Phase::Basic => &self.basic,
            Phase::Adjustment => &self.adjustment,
        }
    }

    /// Returns the total number of iterations across both phases.
    #[must_use]
    pub fn iters(&self) -> usize {
        self.basic.len() + self.adjustment.len()
    }

    pub(super) fn record(&mut self, phase: Phase, delta: f64) {
        match phase {
            Phase::Basic => self.basic.push(delta),
            Phase::Adjustment => self.adjustment.push(delta),
        }
    }
}

/// The result of a fixed-point solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Final solver status.
    pub status: Status,
    /// Phase that was running when the solver finished.
    pub phase: Phase,
    /// Final leakage estimate with the density, temperature, and pressure
    /// recomputed from it.
    pub state: SimulationState,
    /// Convergence deltas of every iteration.
    pub history: History,
}
