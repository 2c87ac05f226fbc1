use crate::TimeSeries;

/// Mutually consistent cavern state over the whole time grid.
///
/// All four series share the grid of the [`Parameters`](crate::Parameters)
/// they were computed from and were derived from the same leakage estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    /// Air density, kg/m³.
    pub density: TimeSeries,
    /// Air temperature, K.
    pub temperature: TimeSeries,
    /// Air pressure, Pa.
    pub pressure: TimeSeries,
    /// Leakage rate through the surrounding rock, kg/s.
    pub leakage: TimeSeries,
}
