use serde::Deserialize;

/// Configuration for the fixed-point leakage solver.
///
/// Deserializes with every field optional.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// A phase converges once its delta drops below this value.
    pub delta_tol: f64,
    /// Iteration limit of the basic phase.
    pub basic_max_iters: usize,
    /// Iteration limit of the adjustment phase.
    pub adjustment_max_iters: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delta_tol: 1.0,
            basic_max_iters: 100,
            adjustment_max_iters: 100,
        }
    }
}

impl Config {
    /// Validates the tolerance and iteration limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is not finite and strictly positive,
    /// or if either iteration limit is zero.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.delta_tol.is_finite() || self.delta_tol <= 0.0 {
            return Err("delta_tol must be finite and strictly positive");
        }
        if self.basic_max_iters == 0 {
            return Err("basic_max_iters must be at least 1");
        }
        if self.adjustment_max_iters == 0 {
            return Err("adjustment_max_iters must be at least 1");
        }
        Ok(())
    }
}
