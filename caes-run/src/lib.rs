//! Runs the CAES cavern model from a TOML run file.

mod report;
mod run_file;

use std::path::Path;

use anyhow::{Context, Result};
use caes_model::{
    StateEquations,
    schedule::{ScheduleSampler, Sign},
};
use caes_solve::fixed_point;
use log::info;

pub use report::Report;
pub use run_file::{RunFile, ScheduleFiles};

/// Loads a run file and solves it.
///
/// # Errors
///
/// Returns an error if the run file, parameters, or schedules are invalid,
/// or if the solver fails.
pub fn run(path: &Path) -> Result<Report> {
    let run_file = RunFile::load(path)?;
    solve(&run_file)
}

/// Solves an already loaded run file.
///
/// # Errors
///
/// See [`run`].
pub fn solve(run_file: &RunFile) -> Result<Report> {
    let params = run_file
        .parameters
        .build()
        .context("invalid cavern parameters")?;
    let grid = params.time_grid();

    let injection = ScheduleSampler::from_path(&run_file.schedule.injection, Sign::Injection)?
        .sample(grid)
        .context("failed to sample the injection schedule")?;
    let extraction = ScheduleSampler::from_path(&run_file.schedule.extraction, Sign::Extraction)?
        .sample(grid)
        .context("failed to sample the extraction schedule")?;

    info!(
        "sampled schedules onto {} grid points (step {} s)",
        grid.len(),
        grid.step()
    );

    let equations = StateEquations::new(&params, injection, extraction)?;
    let preview = equations
        .initial_state()
        .context("failed to evaluate the zero-leakage state")?;

    let solution = fixed_point::solve_unobserved(&equations, &run_file.solver)
        .context("leakage iteration failed")?;

    Ok(Report::new(&equations, preview, solution))
}
