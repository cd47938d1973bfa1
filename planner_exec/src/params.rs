//! Planner parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// Internal
use crate::modules::ModuleKind;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the planner.
///
/// Built once at startup and passed by reference to everything that needs
/// them.
#[derive(Deserialize, Debug, Clone)]
pub struct PlannerParams {
    /// Number of stages in the horizon (N).
    pub horizon: usize,

    /// Time between two stages.
    ///
    /// Units: seconds
    pub integrator_step: f64,

    /// Rate at which the control loop is run.
    ///
    /// Units: Hertz
    pub control_frequency_hz: f64,

    /// Number of obstacles handed to the solver every cycle (M).
    pub max_obstacles: usize,

    /// If true the previous solution is shifted forward by one stage when
    /// warm starting.
    pub shift_previous_solution_forward: bool,

    /// Deceleration applied by the executable when a cycle fails.
    ///
    /// Units: meters/second^2
    pub deceleration_at_infeasible: f64,

    /// Number of past positions kept in the real-time data.
    pub past_trajectory_length: usize,

    /// Modules to register, in order.
    pub modules: Vec<ModuleKind>,

    pub robot: RobotParams,
    pub road: RoadParams,
    pub weights: WeightParams,
    pub contouring: ContouringParams,
    pub probabilistic: ProbabilisticParams,
    pub visualisation: VisualisationParams,
    pub rollout: RolloutParams,
}

/// Dimensions of the robot footprint.
#[derive(Deserialize, Debug, Clone)]
pub struct RobotParams {
    /// Units: meters
    pub length: f64,

    /// Units: meters
    pub width: f64,

    /// Number of discs used to approximate the footprint.
    pub n_discs: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RoadParams {
    /// Total width of the road, the path runs down its centre.
    ///
    /// Units: meters
    pub width: f64,

    /// If true the road carries oncoming traffic and the robot may use extra
    /// width on the left.
    pub two_way: bool,
}

/// Objective weights.
#[derive(Deserialize, Debug, Clone)]
pub struct WeightParams {
    pub goal: f64,
    pub contour: f64,
    pub lag: f64,
    pub preview: f64,
    pub acceleration: f64,
    pub angular_velocity: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ContouringParams {
    /// Number of spline segments passed to the solver ahead of the robot.
    pub num_segments: usize,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProbabilisticParams {
    /// Accepted probability of collision with each obstacle.
    pub risk: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VisualisationParams {
    /// Draw obstacle predictions every this many stages.
    pub draw_every: usize,
}

/// Limits and gains of the kinematic rollout solver.
#[derive(Deserialize, Debug, Clone)]
pub struct RolloutParams {
    /// Units: meters/second
    pub max_speed: f64,

    /// Units: meters/second^2
    pub max_acceleration: f64,

    /// Units: radians/second
    pub max_angular_velocity: f64,

    /// Proportional gain from heading error to angular velocity.
    pub heading_gain: f64,

    /// Distance ahead of the current progress at which the path is tracked.
    ///
    /// Units: meters
    pub lookahead_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while building the planner.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Invalid planner parameters: {0}")]
    InvalidParams(String),

    #[error("The solver horizon ({solver}) does not match the configured horizon ({params})")]
    HorizonMismatch { solver: usize, params: usize },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlannerParams {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), PlannerError> {
        let invalid = |msg: &str| Err(PlannerError::InvalidParams(msg.into()));

        if self.horizon < 2 {
            return invalid("horizon must be at least 2");
        }
        if !(self.integrator_step > 0.0) {
            return invalid("integrator_step must be positive");
        }
        if !(self.control_frequency_hz > 0.0) {
            return invalid("control_frequency_hz must be positive");
        }
        if self.robot.n_discs == 0 {
            return invalid("robot.n_discs must be at least 1");
        }
        if !(self.robot.length > 0.0 && self.robot.width > 0.0) {
            return invalid("robot dimensions must be positive");
        }
        if !(self.probabilistic.risk > 0.0 && self.probabilistic.risk < 1.0) {
            return invalid("probabilistic.risk must be in (0, 1)");
        }
        if self.contouring.num_segments == 0 {
            return invalid("contouring.num_segments must be at least 1");
        }

        Ok(())
    }

    /// Period of the control loop.
    ///
    /// Units: seconds
    pub fn control_period_s(&self) -> f64 {
        1.0 / self.control_frequency_hz
    }
}
