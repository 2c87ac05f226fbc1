use std::fmt;

use caes_model::Feedback;

/// Iteration phase of the fixed-point solver.
///
/// Phases run in declaration order, each seeded with the estimate the
/// previous one converged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Coarse phase whose temperature solution ignores leakage.
    Basic,
    /// Refined phase in which leakage also carries energy out of the cavern.
    Adjustment,
}

impl Phase {
    /// Both phases in the order they run.
    pub const ALL: [Phase; 2] = [Phase::Basic, Phase::Adjustment];

    /// Returns the equation mode used while iterating this phase.
    #[must_use]
    pub fn feedback(self) -> Feedback {
        match self {
            Phase::Basic => Feedback::WithoutLeakage,
            Phase::Adjustment => Feedback::WithLeakage,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Basic => f.write_str("basic"),
            Phase::Adjustment => f.write_str("adjustment"),
        }
    }
}
