//! Goal objective

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::data::{ModuleData, RealTimeData, State};
use crate::params::PlannerParams;
use crate::solver::Solver;
use crate::visuals::{Marker, Shape, VisualsSink};

use super::{ControllerModule, ModuleType};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pulls the robot towards the goal position.
pub struct GoalModule {
    weight: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GoalModule {
    pub fn new(params: &PlannerParams) -> Self {
        Self {
            weight: params.weights.goal,
        }
    }
}

impl ControllerModule for GoalModule {
    fn name(&self) -> &str {
        "goal"
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::Objective
    }

    fn is_data_ready(&self, data: &RealTimeData, missing_data: &mut String) -> bool {
        if !data.goal_received {
            missing_data.push_str("Goal ");
        }

        data.goal_received
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
        solver.set_parameter(k, "goal_x", data.goal.x);
        solver.set_parameter(k, "goal_y", data.goal.y);
        solver.set_parameter(k, "goal_weight", self.weight);
    }

    fn visualize(&self, data: &RealTimeData, _module_data: &ModuleData, visuals: &mut dyn VisualsSink) {
        if !data.goal_received {
            return;
        }

        visuals.publish(
            "goal/markers",
            vec![Marker::point(data.goal, 0.4, Shape::Sphere, 5)],
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::test::default_params;
    use nalgebra::Vector2;

    #[test]
    fn test_goal_readiness() {
        let params = default_params();
        let module = GoalModule::new(&params);
        let mut data = RealTimeData::new(0.65, 0.5, 1, 10);

        let mut missing = String::new();
        assert!(!module.is_data_ready(&data, &mut missing));
        assert_eq!(missing, "Goal ");

        data.goal = Vector2::new(1.0, 2.0);
        data.goal_received = true;
        let mut missing = String::new();
        assert!(module.is_data_ready(&data, &mut missing));
        assert!(missing.is_empty());
    }
}
