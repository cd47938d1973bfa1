//! Dynamic obstacles and their motion predictions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Identifier given to the padding obstacles added during normalisation.
pub const DUMMY_OBSTACLE_ID: i64 = -1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A moving obstacle observed around the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicObstacle {
    /// Identifier assigned by the perception source.
    pub id: i64,

    /// Current position.
    ///
    /// Units: meters
    pub position: Vector2<f64>,

    /// Heading of the obstacle.
    ///
    /// Units: radians
    pub angle: f64,

    /// Physical radius of the obstacle.
    ///
    /// Units: meters
    pub radius: f64,

    /// Predicted motion over the horizon.
    pub prediction: Prediction,
}

/// The predicted motion of an obstacle, one step per horizon stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub kind: PredictionType,
    pub steps: Vec<PredictionStep>,
}

/// One step of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionStep {
    /// Predicted position.
    ///
    /// Units: meters
    pub position: Vector2<f64>,

    /// Predicted heading.
    ///
    /// Units: radians
    pub angle: f64,

    /// Major radius of the uncertainty ellipse. Before propagation this is
    /// the per-step uncertainty rate, after propagation the accumulated
    /// radius.
    ///
    /// Units: meters
    pub major_radius: f64,

    /// Minor radius of the uncertainty ellipse, see `major_radius`.
    ///
    /// Units: meters
    pub minor_radius: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The kind of motion hypothesis held by a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    Deterministic,
    Gaussian,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DynamicObstacle {
    pub fn new(id: i64, position: Vector2<f64>, angle: f64, radius: f64) -> Self {
        Self {
            id,
            position,
            angle,
            radius,
            prediction: Prediction::new(PredictionType::Deterministic),
        }
    }

    /// True if this obstacle was added as padding during normalisation.
    pub fn is_dummy(&self) -> bool {
        self.id == DUMMY_OBSTACLE_ID
    }
}

impl Prediction {
    pub fn new(kind: PredictionType) -> Self {
        Self {
            kind,
            steps: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

impl PredictionStep {
    pub fn new(position: Vector2<f64>, angle: f64, major_radius: f64, minor_radius: f64) -> Self {
        Self {
            position,
            angle,
            major_radius,
            minor_radius,
        }
    }
}
