//! Solvers for the CAES cavern model.

mod observe;

pub mod fixed_point;

pub use observe::Observer;
