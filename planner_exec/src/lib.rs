//! # Planner library.
//!
//! The decision-cycle core of a receding horizon (MPC) motion planner. Each
//! control cycle the [`Planner`] checks its modules have the data they need,
//! warm starts the solver, lets each module write its part of the problem and
//! extracts the planned trajectory.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data model - robot state, reference path, obstacles and planner output
pub mod data;

/// Ingestion - queues external data until the start of the next cycle
pub mod ingest;

/// Controller modules - the objective and constraint terms of the problem
pub mod modules;

/// Obstacle pipeline - normalisation and uncertainty propagation
pub mod obstacles;

/// Planner parameters
pub mod params;

/// Planner - the per-cycle orchestrator
pub mod planner;

/// Solver facade and the kinematic rollout solver
pub mod solver;

/// Path tracking geometry - cubic splines and closest point search
pub mod spline;

/// Debug visualisation sinks and marker helpers
pub mod visuals;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::{PlannerError, PlannerParams};
pub use planner::Planner;
