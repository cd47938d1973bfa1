//! Road corridor constraints
//!
//! Hands the linear constraints built earlier in the cycle (by
//! [`super::Contouring`]) to the solver.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::data::{Halfspace, ModuleData, RealTimeData, State};
use crate::params::PlannerParams;
use crate::solver::Solver;

use super::{ControllerModule, ModuleType};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of linear constraints the solver accepts per stage.
pub const NUM_CONSTRAINTS: usize = 2;

/// Parameter fields of each constraint, `a1 x + a2 y <= b`.
pub const CONSTRAINT_FIELDS: [&str; 3] = ["a1", "a2", "b"];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct RoadConstraints;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoadConstraints {
    pub fn new(_params: &PlannerParams) -> Self {
        Self
    }
}

impl ControllerModule for RoadConstraints {
    fn name(&self) -> &str {
        "road_constraints"
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::Constraint
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
        module_data: &ModuleData,
        k: usize,
    ) {
        let stage = module_data.static_obstacles.get(k);

        for h in 0..NUM_CONSTRAINTS {
            // Unused slots get a constraint which is always satisfied
            let halfspace = stage
                .and_then(|s| s.get(h))
                .copied()
                .unwrap_or_else(Halfspace::dummy);

            solver.set_parameter(k, &constraint_param(h, "a1"), halfspace.a.x);
            solver.set_parameter(k, &constraint_param(h, "a2"), halfspace.a.y);
            solver.set_parameter(k, &constraint_param(h, "b"), halfspace.b);
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Name of a field of the `h`th linear constraint.
pub fn constraint_param(h: usize, field: &str) -> String {
    format!("lin_constraint_{}_{}", h, field)
}
