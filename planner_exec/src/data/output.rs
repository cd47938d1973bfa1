//! Planner output

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A planned sequence of positions, one per stage after the initial one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    /// Time between consecutive points.
    ///
    /// Units: seconds
    pub dt: f64,

    pub positions: Vec<Vector2<f64>>,
}

/// The result of one planning cycle.
///
/// A new output replaces the previous one as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannerOutput {
    pub trajectory: Trajectory,
    pub success: bool,

    /// Why the cycle failed, `None` on success.
    pub failure: Option<PlanFailure>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Recoverable reasons for a cycle to fail. The planner retries on the next
/// cycle.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum PlanFailure {
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("The solve was infeasible (exit code {0})")]
    InfeasibleSolve(i32),

    #[error("The solver did not provide the output {name} at stage {stage}")]
    MissingOutput { stage: usize, name: String },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            positions: Vec::new(),
        }
    }

    pub fn add(&mut self, position: Vector2<f64>) {
        self.positions.push(position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn last(&self) -> Option<&Vector2<f64>> {
        self.positions.last()
    }
}

impl PlannerOutput {
    pub fn new(dt: f64) -> Self {
        Self {
            trajectory: Trajectory::new(dt),
            success: false,
            failure: None,
        }
    }

    pub fn succeeded(trajectory: Trajectory) -> Self {
        Self {
            trajectory,
            success: true,
            failure: None,
        }
    }

    pub fn failed(dt: f64, failure: PlanFailure) -> Self {
        Self {
            trajectory: Trajectory::new(dt),
            success: false,
            failure: Some(failure),
        }
    }
}
