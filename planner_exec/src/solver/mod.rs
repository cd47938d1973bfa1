//! # Solver interface
//!
//! The numerical optimiser is used through the [`Solver`] trait. The planner
//! writes per-stage parameters into it, seeds its initial guess, solves and
//! reads the optimised stage values back out.
//!
//! [`RolloutSolver`] is a kinematic stand-in used by the executable and the
//! tests.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod rollout;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;

use serde::Serialize;

use crate::data::State;

pub use rollout::RolloutSolver;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Status code returned by a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExitCode(pub i32);

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Facade over the numerical optimiser.
///
/// Stage `k` runs from `0` to `horizon() - 1`, stage 0 is fixed to the
/// measured state.
pub trait Solver {
    /// Number of stages (N).
    fn horizon(&self) -> usize;

    /// Time between stages.
    ///
    /// Units: seconds
    fn dt(&self) -> f64;

    fn set_parameter(&mut self, k: usize, name: &str, value: f64);

    /// True if the solver's parameter schema includes `name`.
    fn has_parameter(&self, name: &str) -> bool;

    /// Fix the initial stage to the given state.
    fn set_xinit(&mut self, state: &State);

    /// Build an initial guess that holds the given state over the horizon.
    fn initialize_with_state(&mut self, state: &State);

    /// Build an initial guess from the previous solution, optionally shifted
    /// forward by one stage.
    fn initialize_warmstart(&mut self, state: &State, shift_forward: bool);

    /// Hand the prepared initial guess to the optimiser.
    fn load_warmstart(&mut self);

    fn solve(&mut self) -> ExitCode;

    /// Value of an optimised variable at stage `k`, `None` if the solver
    /// doesn't have it.
    fn get_output(&self, k: usize, name: &str) -> Option<f64>;

    /// Value of a variable at stage `k` in the current initial guess.
    fn get_ego_prediction(&self, k: usize, name: &str) -> f64;

    /// Clear all parameters and solutions.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(1);
    pub const INFEASIBLE: ExitCode = ExitCode(0);
    pub const INVALID_PARAMETERS: ExitCode = ExitCode(-2);
    pub const NUMERICAL_FAILURE: ExitCode = ExitCode(-7);

    /// Returned by modules which do not replace the solve.
    pub const NOT_OPTIMIZED_YET: ExitCode = ExitCode(-999);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match *self {
            Self::SUCCESS => "success",
            Self::INFEASIBLE => "infeasible",
            Self::INVALID_PARAMETERS => "invalid parameters",
            Self::NUMERICAL_FAILURE => "numerical failure",
            Self::NOT_OPTIMIZED_YET => "not optimized yet",
            _ => "unknown",
        };

        write!(f, "{} ({})", self.0, desc)
    }
}
