use std::fmt;

use caes_model::{SimulationState, StateEquations, TimeSeries};
use caes_solve::fixed_point::{Phase, Solution};
use uom::si::length::meter;

const SECONDS_PER_HOUR: f64 = 3600.0;
const PASCALS_PER_MEGAPASCAL: f64 = 1e6;

/// Outcome of a run, formatted for the terminal.
#[derive(Debug, Clone)]
pub struct Report {
    /// Reservoir edge radius, m.
    pub reservoir_radius: f64,
    /// Whether the radius was derived from the rock properties.
    pub radius_derived: bool,
    /// Grid times, s.
    pub times: TimeSeries,
    /// Mass injected over the run, kg.
    pub injected_mass: f64,
    /// Mass extracted over the run, kg.
    pub extracted_mass: f64,
    /// Mass lost through the rock over the run, kg.
    pub leaked_mass: f64,
    /// State computed before any leakage has been accounted for.
    pub preview: SimulationState,
    /// Converged solution.
    pub solution: Solution,
}

impl Report {
    pub(crate) fn new(
        equations: &StateEquations<'_>,
        preview: SimulationState,
        solution: Solution,
    ) -> Self {
        let params = equations.parameters();
        let dt = params.time_grid().step();

        Self {
            reservoir_radius: params.reservoir_radius().get::<meter>(),
            radius_derived: params.is_reservoir_radius_derived(),
            times: params.time_grid().times().clone(),
            injected_mass: equations.injection().sum() * dt,
            extracted_mass: -equations.extraction().sum() * dt,
            leaked_mass: solution.state.leakage.sum() * dt,
            preview,
            solution,
        }
    }
}

/// Returns the index and value of the largest entry.
fn peak(series: &TimeSeries) -> (usize, f64) {
    series
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 { (i, v) } else { best }
        })
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = |i: usize| self.times[i] / SECONDS_PER_HOUR;
        let last = self.times.len() - 1;

        writeln!(
            f,
            "reservoir radius: {:.3} m ({})",
            self.reservoir_radius,
            if self.radius_derived { "derived" } else { "fixed" }
        )?;
        writeln!(
            f,
            "time grid: {} points over {:.2} h",
            self.times.len(),
            hours(last)
        )?;

        let (i, p) = peak(&self.preview.pressure);
        writeln!(
            f,
            "zero-leakage peak pressure: {:.4} MPa at {:.2} h",
            p / PASCALS_PER_MEGAPASCAL,
            hours(i)
        )?;

        for phase in Phase::ALL {
            let deltas = self.solution.history.phase(phase);
            let formatted: Vec<String> = deltas.iter().map(|d| format!("{d:.4}")).collect();
            writeln!(
                f,
                "{phase} phase: {} iterations, deltas [{}]",
                deltas.len(),
                formatted.join(", ")
            )?;
        }

        let state = &self.solution.state;
        let (i, p) = peak(&state.pressure);
        writeln!(
            f,
            "peak pressure: {:.4} MPa at {:.2} h",
            p / PASCALS_PER_MEGAPASCAL,
            hours(i)
        )?;
        writeln!(
            f,
            "mass balance: injected {:.1} kg, extracted {:.1} kg, leaked {:.1} kg",
            self.injected_mass,
            self.extracted_mass,
            self.leaked_mass
        )?;
        let (i, ml) = peak(&state.leakage);
        writeln!(f, "peak leakage: {ml:.5} kg/s at {:.2} h", hours(i))?;
        write!(
            f,
            "final state at {:.2} h: pressure {:.4} MPa, temperature {:.2} K, density {:.4} kg/m³, leakage {:.5} kg/s",
            hours(last),
            state.pressure[last] / PASCALS_PER_MEGAPASCAL,
            state.temperature[last],
            state.density[last],
            state.leakage[last]
        )
    }
}
