//! Lumped thermodynamic model of a compressed-air energy storage cavern.
//!
//! The cavern is treated as a single well-mixed control volume whose air
//! density, temperature, and pressure respond to prescribed injection and
//! extraction mass rates, while air leaks radially through the surrounding
//! rock toward a far-field boundary held at the reservoir edge pressure.

mod equations;
mod error;
mod feedback;
mod params;
mod state;
mod time_grid;

pub mod schedule;
pub mod units;

pub use equations::StateEquations;
pub use error::ModelError;
pub use feedback::Feedback;
pub use params::{Parameters, ParametersConfig};
pub use state::SimulationState;
pub use time_grid::{TimeGrid, TimeSeries};
