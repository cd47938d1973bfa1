//! Obstacle set normalisation
//!
//! The solver is generated for a fixed number of obstacles, so every set of
//! observed obstacles is cut down or padded to exactly that number before it
//! is used.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;
use ordered_float::OrderedFloat;

use crate::data::{
    DynamicObstacle, Prediction, PredictionStep, PredictionType, DUMMY_OBSTACLE_ID,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Offset of dummy obstacles from the robot, far enough away that they never
/// interact with any constraint.
///
/// Units: meters
pub const DUMMY_OFFSET_M: f64 = 100.0;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Create a dummy obstacle for a robot at `robot_pos`.
///
/// The dummy has zero radius and carries no prediction, see
/// [`ensure_obstacle_size`] for the padded version.
pub fn dummy_obstacle(robot_pos: Vector2<f64>) -> DynamicObstacle {
    DynamicObstacle::new(
        DUMMY_OBSTACLE_ID,
        robot_pos + Vector2::new(DUMMY_OFFSET_M, DUMMY_OFFSET_M),
        0.0,
        0.0,
    )
}

/// Predict `steps` positions of an obstacle moving at constant `velocity`.
///
/// Step `k` is at `position + velocity * dt * k`, the first step is the
/// current position.
pub fn constant_velocity_prediction(
    position: Vector2<f64>,
    velocity: Vector2<f64>,
    dt: f64,
    steps: usize,
) -> Prediction {
    let mut prediction = Prediction::new(PredictionType::Deterministic);
    let angle = velocity.y.atan2(velocity.x);

    prediction.steps = (0..steps)
        .map(|k| PredictionStep::new(position + velocity * dt * k as f64, angle, 0.0, 0.0))
        .collect();

    prediction
}

/// Constant velocity prediction with a fixed per-step uncertainty rate.
///
/// The radii on each step are rates, they must be propagated with
/// [`super::propagate_prediction_uncertainty`] before use.
pub fn gaussian_constant_velocity_prediction(
    position: Vector2<f64>,
    velocity: Vector2<f64>,
    dt: f64,
    steps: usize,
    major_rate: f64,
    minor_rate: f64,
) -> Prediction {
    let mut prediction = constant_velocity_prediction(position, velocity, dt, steps);
    prediction.kind = PredictionType::Gaussian;

    for step in prediction.steps.iter_mut() {
        step.major_radius = major_rate;
        step.minor_radius = minor_rate;
    }

    prediction
}

/// Cut or pad `obstacles` so that it holds exactly `max_obstacles` entries.
///
/// If there are too many obstacles only the ones closest to `robot_pos` are
/// kept. If there are too few, stationary dummy obstacles are appended with a
/// prediction of `horizon` steps spaced by `dt`.
pub fn ensure_obstacle_size(
    obstacles: &mut Vec<DynamicObstacle>,
    robot_pos: Vector2<f64>,
    max_obstacles: usize,
    dt: f64,
    horizon: usize,
) {
    if obstacles.len() > max_obstacles {
        debug!(
            "Received {} > {} obstacles, keeping the closest",
            obstacles.len(),
            max_obstacles
        );

        obstacles.sort_by_cached_key(|o| OrderedFloat((o.position - robot_pos).norm()));
        obstacles.truncate(max_obstacles);
    } else if obstacles.len() < max_obstacles {
        debug!(
            "Received {} < {} obstacles, adding dummies",
            obstacles.len(),
            max_obstacles
        );

        while obstacles.len() < max_obstacles {
            let mut dummy = dummy_obstacle(robot_pos);
            dummy.prediction =
                constant_velocity_prediction(dummy.position, Vector2::zeros(), dt, horizon);
            obstacles.push(dummy);
        }
    }
}
