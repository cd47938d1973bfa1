//! # Planner data model
//!
//! Plain data used by the planner: the robot state, the reference path,
//! dynamic obstacles, the real-time data aggregate, per-cycle module data and
//! the planner output.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod module_data;
pub mod obstacle;
pub mod output;
pub mod path;
pub mod realtime;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use module_data::*;
pub use obstacle::*;
pub use output::*;
pub use path::*;
pub use realtime::*;
pub use state::State;
