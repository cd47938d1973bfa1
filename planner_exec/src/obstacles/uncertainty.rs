//! Prediction uncertainty
//!
//! Gaussian predictions arrive with a per-step uncertainty rate on each step.
//! Propagation accumulates these rates into ellipse radii that grow over the
//! horizon.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;

use util::maths::exponential_quantile;

use crate::data::{DynamicObstacle, Prediction, PredictionType};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Accumulate the per-step uncertainty of a Gaussian prediction.
///
/// For each of the first `horizon` steps the radii become the root sum of
/// squares of the previous accumulated radius and the step's rate times `dt`.
/// Propagation compounds, so it must be applied exactly once to each received
/// prediction. Non-Gaussian predictions are left untouched.
pub fn propagate_prediction_uncertainty(prediction: &mut Prediction, dt: f64, horizon: usize) {
    if prediction.kind != PredictionType::Gaussian {
        warn!("Cannot propagate uncertainty for predictions that are not Gaussian");
        return;
    }

    let mut major = 0.0f64;
    let mut minor = 0.0f64;

    for step in prediction.steps.iter_mut().take(horizon) {
        major = major.hypot(step.major_radius * dt);
        minor = minor.hypot(step.minor_radius * dt);
        step.major_radius = major;
        step.minor_radius = minor;
    }
}

/// Propagate the uncertainty of every Gaussian obstacle in the set.
///
/// Deterministic obstacles, including dummies, are skipped silently.
pub fn propagate_obstacles_uncertainty(
    obstacles: &mut [DynamicObstacle],
    dt: f64,
    horizon: usize,
) {
    for obstacle in obstacles
        .iter_mut()
        .filter(|o| o.prediction.kind == PredictionType::Gaussian)
    {
        propagate_prediction_uncertainty(&mut obstacle.prediction, dt, horizon);
    }
}

/// Inflation factor applied to the major radius for an accepted collision
/// probability of `risk`.
///
/// This is the square root of the chi-squared (two degrees of freedom)
/// quantile at `1 - risk`.
pub fn risk_scale(risk: f64) -> f64 {
    exponential_quantile(0.5, 1.0 - risk).sqrt()
}

/// Effective avoidance radius of an obstacle with the given accumulated major
/// radius.
pub fn risk_scaled_radius(major_radius: f64, obstacle_radius: f64, risk: f64) -> f64 {
    major_radius * risk_scale(risk) + obstacle_radius
}
