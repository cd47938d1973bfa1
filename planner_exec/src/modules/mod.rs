//! # Controller modules
//!
//! Each module contributes part of the optimisation problem: an objective
//! term or a set of constraints. The planner runs the modules in registration
//! order every cycle:
//!
//! 1. `is_data_ready` on every module, any missing data aborts the cycle,
//! 2. `update` on every module, which may write per-cycle [`ModuleData`] for
//!    later modules,
//! 3. `set_parameters` for every stage, constraint modules skip stage 0,
//! 4. `optimize`, the first module to return an exit code replaces the solve.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod contouring;
pub mod gaussian_constraints;
pub mod goal;
pub mod mpc_base;
pub mod road_constraints;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::data::{ModuleData, RealTimeData, State};
use crate::params::PlannerParams;
use crate::solver::{ExitCode, Solver};
use crate::visuals::VisualsSink;

pub use contouring::Contouring;
pub use gaussian_constraints::GaussianConstraints;
pub use goal::GoalModule;
pub use mpc_base::MpcBase;
pub use road_constraints::RoadConstraints;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The role of a module in the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType {
    Objective,

    /// Constraint modules are not parameterised at stage 0, which is fixed to
    /// the measured state.
    Constraint,
}

/// The modules which can be registered from the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    MpcBase,
    Contouring,
    Goal,
    RoadConstraints,
    GaussianConstraints,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A part of the optimisation problem.
pub trait ControllerModule {
    fn name(&self) -> &str;

    fn module_type(&self) -> ModuleType;

    /// Check the module has what it needs for this cycle. Names of missing
    /// inputs are appended to `missing_data`.
    fn is_data_ready(&self, data: &RealTimeData, missing_data: &mut String) -> bool;

    /// Recompute internal state for this cycle.
    fn update(
        &mut self,
        state: &mut State,
        data: &RealTimeData,
        module_data: &mut ModuleData,
        solver: &dyn Solver,
    );

    /// Write this module's parameters for stage `k`.
    fn set_parameters(
        &mut self,
        solver: &mut dyn Solver,
        data: &RealTimeData,
        module_data: &ModuleData,
        k: usize,
    );

    /// Optionally replace the solve. `None` lets the next module, and
    /// finally the solver, take over.
    fn optimize(
        &mut self,
        _state: &State,
        _data: &RealTimeData,
        _module_data: &ModuleData,
        _solver: &mut dyn Solver,
    ) -> Option<ExitCode> {
        None
    }

    fn visualize(&self, _data: &RealTimeData, _module_data: &ModuleData, _visuals: &mut dyn VisualsSink) {}

    /// Clear internal caches.
    fn reset(&mut self) {}

    /// Called when the named external data has changed.
    fn on_data_received(&mut self, _data: &RealTimeData, _data_name: &str) {}

    fn is_objective_reached(&self, _data: &RealTimeData) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the modules listed in the parameters, in order.
pub fn build_modules(params: &PlannerParams) -> Vec<Box<dyn ControllerModule>> {
    params
        .modules
        .iter()
        .map(|kind| -> Box<dyn ControllerModule> {
            match kind {
                ModuleKind::MpcBase => Box::new(MpcBase::new(params)),
                ModuleKind::Contouring => Box::new(Contouring::new(params)),
                ModuleKind::Goal => Box::new(GoalModule::new(params)),
                ModuleKind::RoadConstraints => Box::new(RoadConstraints::new(params)),
                ModuleKind::GaussianConstraints => Box::new(GaussianConstraints::new(params)),
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::test::default_params;

    #[test]
    fn test_build_modules() {
        let params = default_params();
        let modules = build_modules(&params);

        let names: Vec<&str> = modules.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "mpc_base",
                "contouring",
                "goal",
                "road_constraints",
                "gaussian_constraints"
            ]
        );

        assert_eq!(modules[3].module_type(), ModuleType::Constraint);
        assert_eq!(modules[1].module_type(), ModuleType::Objective);
    }
}
