//! Reference path

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used when checking whether a waypoint matches a path point.
///
/// Units: meters
const POINT_TOLERANCE_M: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ordered sequence of waypoints the robot should follow.
///
/// The path is replaced as a whole when new path data arrives, it is never
/// partially updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferencePath {
    pub x: Vec<f64>,
    pub y: Vec<f64>,

    /// Optional heading at each waypoint.
    #[serde(default)]
    pub psi: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReferencePath {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            x,
            y,
            psi: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.psi.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// The waypoint at the given index, if any.
    pub fn point(&self, index: usize) -> Option<Vector2<f64>> {
        Some(Vector2::new(*self.x.get(index)?, *self.y.get(index)?))
    }

    /// Check whether the waypoint at `index` is at `(x, y)`.
    pub fn point_in_path(&self, index: usize, x: f64, y: f64) -> bool {
        match self.point(index) {
            Some(p) => (p - Vector2::new(x, y)).norm() < POINT_TOLERANCE_M,
            None => false,
        }
    }

    /// Check whether `other` is the same path as this one.
    ///
    /// Paths are the same if they have the same number of points and agree on
    /// the first two points. Identical paths are often re-sent by the path
    /// source and must not trigger a refit. A path whose coordinate lists
    /// differ in length is never the same as another.
    pub fn is_same_as(&self, other: &ReferencePath) -> bool {
        if self.len() != other.len() || other.x.len() != other.y.len() {
            return false;
        }

        (0..self.len().min(2)).all(|i| match other.point(i) {
            Some(p) => self.point_in_path(i, p.x, p.y),
            None => false,
        })
    }
}
