//! Per-cycle data shared between modules

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A linear half-plane `a·p <= b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Halfspace {
    pub a: Vector2<f64>,
    pub b: f64,
}

/// Artifacts produced by modules during a single cycle.
///
/// Created empty at the start of every cycle. A module may only read what an
/// earlier registered module has written in the same cycle.
#[derive(Debug, Clone, Default)]
pub struct ModuleData {
    /// Linear constraints for each stage of the horizon. Empty if no module
    /// produced any.
    pub static_obstacles: Vec<Vec<Halfspace>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Halfspace {
    pub fn new(a: Vector2<f64>, b: f64) -> Self {
        Self { a, b }
    }

    /// A constraint which every point satisfies.
    pub fn dummy() -> Self {
        Self::new(Vector2::zeros(), 1.0)
    }

    /// Signed constraint value, non-positive when `p` is inside.
    pub fn evaluate(&self, p: &Vector2<f64>) -> f64 {
        self.a.dot(p) - self.b
    }

    pub fn contains(&self, p: &Vector2<f64>) -> bool {
        self.evaluate(p) <= 0.0
    }
}

impl ModuleData {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_halfspace() {
        // y <= 1
        let h = Halfspace::new(Vector2::new(0.0, 1.0), 1.0);
        assert!(h.contains(&Vector2::new(5.0, 0.5)));
        assert!(!h.contains(&Vector2::new(5.0, 1.5)));
        assert_eq!(h.evaluate(&Vector2::new(0.0, 3.0)), 2.0);

        assert!(Halfspace::dummy().contains(&Vector2::new(1e6, -1e6)));
    }
}
