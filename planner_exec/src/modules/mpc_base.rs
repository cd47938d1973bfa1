//! Base objective, input weights

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::data::{ModuleData, RealTimeData, State};
use crate::params::PlannerParams;
use crate::solver::Solver;

use super::{ControllerModule, ModuleType};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Penalises the inputs of the robot.
pub struct MpcBase {
    acceleration_weight: f64,
    angular_velocity_weight: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MpcBase {
    pub fn new(params: &PlannerParams) -> Self {
        Self {
            acceleration_weight: params.weights.acceleration,
            angular_velocity_weight: params.weights.angular_velocity,
        }
    }
}

impl ControllerModule for MpcBase {
    fn name(&self) -> &str {
        "mpc_base"
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::Objective
    }

    fn is_data_ready(&self, _data: &RealTimeData, _missing_data: &mut String) -> bool {
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
        _data: &RealTimeData,
        _module_data: &ModuleData,
        k: usize,
    ) {
        solver.set_parameter(k, "acceleration", self.acceleration_weight);
        solver.set_parameter(k, "angular_velocity", self.angular_velocity_weight);
    }
}
