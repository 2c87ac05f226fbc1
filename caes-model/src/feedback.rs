/// Whether leakage feeds back into the cavern energy balance.
///
/// Leakage always removes mass, so density is computed from the supplied
/// leakage series in both modes.
/// The mode only decides whether the leaking mass also carries energy out of
/// the cavern when solving for temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feedback {
    /// Leakage enters the temperature solution as an outflow.
    WithLeakage,
    /// Leakage is left out of the temperature solution.
    WithoutLeakage,
}

impl Feedback {
    /// Returns `true` if leakage takes part in the energy balance.
    #[must_use]
    pub fn includes_leakage(self) -> bool {
        matches!(self, Feedback::WithLeakage)
    }
}
