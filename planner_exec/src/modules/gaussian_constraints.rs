//! # Gaussian obstacle constraints
//!
//! Chance constraints against obstacles with Gaussian predictions. For each
//! stage the solver gets the predicted position of every obstacle along with
//! its uncertainty ellipse radii and the accepted collision risk. Stage `k`
//! is constrained by the prediction at step `k - 1`.
//!
//! The obstacle set must already be normalised to its fixed size and its
//! uncertainty propagated.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::data::{ModuleData, PredictionType, RealTimeData, State};
use crate::obstacles::risk_scaled_radius;
use crate::params::PlannerParams;
use crate::solver::Solver;
use crate::visuals::{Marker, Shape, VisualsSink};

use super::{ControllerModule, ModuleType};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Parameter fields of each obstacle.
pub const OBSTACLE_FIELDS: [&str; 6] = ["x", "y", "major", "minor", "risk", "r"];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct GaussianConstraints {
    max_obstacles: usize,
    risk: f64,
    horizon: usize,
    draw_every: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaussianConstraints {
    pub fn new(params: &PlannerParams) -> Self {
        Self {
            max_obstacles: params.max_obstacles,
            risk: params.probabilistic.risk,
            horizon: params.horizon,
            draw_every: params.visualisation.draw_every.max(1),
        }
    }
}

impl ControllerModule for GaussianConstraints {
    fn name(&self) -> &str {
        "gaussian_constraints"
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::Constraint
    }

    fn is_data_ready(&self, data: &RealTimeData, missing_data: &mut String) -> bool {
        if data.dynamic_obstacles.len() != self.max_obstacles {
            missing_data.push_str("Obstacles ");
            return false;
        }

        for obstacle in &data.dynamic_obstacles {
            if obstacle.prediction.is_empty() {
                missing_data.push_str("Obstacle Prediction ");
                return false;
            }

            // Padding obstacles are deterministic and far away
            if !obstacle.is_dummy() && obstacle.prediction.kind != PredictionType::Gaussian {
                missing_data.push_str("Obstacle Prediction (Type is not Gaussian) ");
                return false;
            }
        }

        true
    }

    fn update(
        &mut self,
        _state: &mut State,
        _data: &RealTimeData,
        _module_data: &mut ModuleData,
        _solver: &dyn Solver,
    ) {
    }

    fn set_parameters(
        &mut self,
        solver: &mut dyn Solver,
        data: &RealTimeData,
        _module_data: &ModuleData,
        k: usize,
    ) {
        if let Some(disc) = data.robot_area.first() {
            solver.set_parameter(k, "ego_disc_radius", disc.radius);
        }
        for disc in &data.robot_area {
            solver.set_parameter(k, &disc_offset_param(disc.id), disc.offset);
        }

        let step_index = k.saturating_sub(1);

        for (i, obstacle) in data.dynamic_obstacles.iter().enumerate() {
            let steps = &obstacle.prediction.steps;
            let step = match steps.get(step_index).or_else(|| steps.last()) {
                Some(s) => s,
                None => continue,
            };

            // Deterministic predictions carry no uncertainty
            let (major, minor) = match obstacle.prediction.kind {
                PredictionType::Gaussian => (step.major_radius, step.minor_radius),
                PredictionType::Deterministic => (0.0, 0.0),
            };

            let values = [
                step.position.x,
                step.position.y,
                major,
                minor,
                self.risk,
                obstacle.radius,
            ];

            for (field, value) in OBSTACLE_FIELDS.iter().zip(values.iter()) {
                solver.set_parameter(k, &obstacle_param(i, field), *value);
            }
        }
    }

    fn visualize(&self, data: &RealTimeData, _module_data: &ModuleData, visuals: &mut dyn VisualsSink) {
        let mut markers = Vec::new();

        for obstacle in data.dynamic_obstacles.iter().filter(|o| !o.is_dummy()) {
            for k in (1..self.horizon).step_by(self.draw_every) {
                let step = match obstacle.prediction.steps.get(k - 1) {
                    Some(s) => s,
                    None => break,
                };

                let radius = risk_scaled_radius(step.major_radius, obstacle.radius, self.risk);
                markers.push(Marker::point(step.position, 2.0 * radius, Shape::Cylinder, k));
            }
        }

        visuals.publish("gaussian_constraints", markers);
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Name of a field of the `i`th obstacle.
pub fn obstacle_param(i: usize, field: &str) -> String {
    format!("gaussian_obst_{}_{}", i, field)
}

/// Name of the offset of the `d`th robot disc.
pub fn disc_offset_param(d: usize) -> String {
    format!("ego_disc_{}_offset", d)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::DynamicObstacle;
    use crate::obstacles::{
        ensure_obstacle_size, gaussian_constant_velocity_prediction,
        propagate_obstacles_uncertainty,
    };
    use crate::params::test::default_params;
    use crate::solver::RolloutSolver;
    use crate::visuals::RecordingVisuals;
    use nalgebra::Vector2;

    fn data_with_obstacle(kind: PredictionType) -> RealTimeData {
        let params = default_params();
        let mut data = RealTimeData::new(
            params.robot.length,
            params.robot.width,
            params.robot.n_discs,
            10,
        );

        let mut obstacle = DynamicObstacle::new(4, Vector2::new(3.0, 1.0), 0.0, 0.4);
        obstacle.prediction = gaussian_constant_velocity_prediction(
            obstacle.position,
            Vector2::new(-1.0, 0.0),
            params.integrator_step,
            params.horizon,
            1.0,
            0.5,
        );
        obstacle.prediction.kind = kind;
        data.dynamic_obstacles.push(obstacle);

        ensure_obstacle_size(
            &mut data.dynamic_obstacles,
            Vector2::zeros(),
            params.max_obstacles,
            params.integrator_step,
            params.horizon,
        );
        propagate_obstacles_uncertainty(
            &mut data.dynamic_obstacles,
            params.integrator_step,
            params.horizon,
        );

        data
    }

    #[test]
    fn test_readiness() {
        let params = default_params();
        let module = GaussianConstraints::new(&params);

        let mut missing = String::new();
        let empty = RealTimeData::new(0.65, 0.5, 1, 10);
        assert!(!module.is_data_ready(&empty, &mut missing));
        assert_eq!(missing, "Obstacles ");

        let mut missing = String::new();
        assert!(module.is_data_ready(&data_with_obstacle(PredictionType::Gaussian), &mut missing));

        let mut missing = String::new();
        assert!(!module.is_data_ready(
            &data_with_obstacle(PredictionType::Deterministic),
            &mut missing
        ));
        assert_eq!(missing, "Obstacle Prediction (Type is not Gaussian) ");

        let mut data = data_with_obstacle(PredictionType::Gaussian);
        data.dynamic_obstacles[0].prediction.steps.clear();
        let mut missing = String::new();
        assert!(!module.is_data_ready(&data, &mut missing));
        assert_eq!(missing, "Obstacle Prediction ");
    }

    #[test]
    fn test_parameters() {
        let params = default_params();
        let mut module = GaussianConstraints::new(&params);
        let mut solver = RolloutSolver::new(&params);
        let data = data_with_obstacle(PredictionType::Gaussian);

        module.set_parameters(&mut solver, &data, &ModuleData::new(), 3);

        let get = |name: &str| solver.get_parameter(3, name).unwrap();

        // Stage 3 uses prediction step 2
        let step = data.dynamic_obstacles[0].prediction.steps[2];
        assert_eq!(get("gaussian_obst_0_x"), step.position.x);
        assert_eq!(get("gaussian_obst_0_major"), step.major_radius);
        assert!(get("gaussian_obst_0_major") > 0.0);
        assert_eq!(get("gaussian_obst_0_risk"), params.probabilistic.risk);
        assert_eq!(get("gaussian_obst_0_r"), 0.4);

        // Dummies have no uncertainty
        assert_eq!(get("gaussian_obst_1_major"), 0.0);
        assert_eq!(get("gaussian_obst_1_x"), 100.0);

        assert_eq!(get("ego_disc_radius"), params.robot.width / 2.0);
        assert_eq!(get("ego_disc_0_offset"), data.robot_area[0].offset);
        assert_eq!(get("ego_disc_2_offset"), data.robot_area[2].offset);
    }

    #[test]
    fn test_visualize() {
        let params = default_params();
        let module = GaussianConstraints::new(&params);
        let data = data_with_obstacle(PredictionType::Gaussian);

        let mut visuals = RecordingVisuals::new();
        module.visualize(&data, &ModuleData::new(), &mut visuals);

        // One real obstacle drawn at stages 1, 5, 9, 13, 17
        assert_eq!(visuals.get("gaussian_constraints").len(), 5);
    }
}
