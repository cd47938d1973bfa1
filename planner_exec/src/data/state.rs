//! Vehicle state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use nalgebra::Vector2;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Position along the x axis.
///
/// Units: meters
pub const X: &str = "x";

/// Position along the y axis.
///
/// Units: meters
pub const Y: &str = "y";

/// Heading, angle to the +ve x axis.
///
/// Units: radians
pub const PSI: &str = "psi";

/// Forward speed.
///
/// Units: meters/second
pub const V: &str = "v";

/// Progress along the reference path (arclength).
///
/// Units: meters
pub const SPLINE: &str = "spline";

/// Fields every state carries, set to zero on creation and reset.
pub const DEFAULT_FIELDS: [&str; 5] = [X, Y, PSI, V, SPLINE];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The measured state of the robot, as a named mapping of scalar fields.
///
/// Written by the ingestion layer between cycles and read by every module.
/// Contouring writes the `spline` progress during its update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct State {
    values: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for State {
    fn default() -> Self {
        Self {
            values: DEFAULT_FIELDS
                .iter()
                .map(|f| (f.to_string(), 0.0))
                .collect(),
        }
    }
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of a field, or zero if the field has never been set.
    pub fn get(&self, name: &str) -> f64 {
        self.try_get(name).unwrap_or(0.0)
    }

    pub fn try_get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        match self.values.get_mut(name) {
            Some(v) => *v = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    /// The 2D position of the robot.
    pub fn pos(&self) -> Vector2<f64> {
        Vector2::new(self.get(X), self.get(Y))
    }

    /// Iterate over all fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Reset the state back to the default fields, all zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_state() {
        let mut state = State::new();
        assert_eq!(state.get(X), 0.0);
        assert_eq!(state.try_get("gamma"), None);
        assert_eq!(state.get("gamma"), 0.0);

        state.set(X, 1.0);
        state.set(Y, -2.0);
        state.set("gamma", 0.3);
        assert_eq!(state.pos(), Vector2::new(1.0, -2.0));
        assert_eq!(state.try_get("gamma"), Some(0.3));
        assert_eq!(state.iter().count(), DEFAULT_FIELDS.len() + 1);

        state.reset();
        assert_eq!(state, State::default());
    }
}
