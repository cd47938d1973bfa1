//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Environment variable pointing at the root of the planner software tree.
pub const SW_ROOT_ENV_VAR: &str = "PLANNER_SW_ROOT";

/// Get the root directory of the planner software.
///
/// Parameter files live in `{root}/params` and sessions in `{root}/sessions`.
pub fn get_planner_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
