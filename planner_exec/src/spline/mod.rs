//! # Path splines
//!
//! A reference path is tracked as a two dimensional curve parameterised by
//! arclength. The curve is made of one cubic polynomial per axis per segment,
//! with one segment between each pair of neighbouring waypoints. The
//! arclength is approximated by the cumulative chord length between
//! waypoints.
//!
//! Evaluating outside `[0, parameter_length]` clamps to the ends of the curve.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cubic;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;
use thiserror::Error;

use util::maths::clamp;

use crate::data::ReferencePath;

pub use cubic::{Cubic, CubicSpline};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of samples taken along each candidate segment when looking for the
/// closest point.
const CLOSEST_SAMPLES_PER_SEGMENT: usize = 10;

/// Number of refinement iterations performed after sampling.
const CLOSEST_REFINE_ITERS: usize = 30;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A two dimensional cubic spline parameterised by arclength.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline2D {
    x: CubicSpline,
    y: CubicSpline,
}

/// The coefficients of one segment as handed to the solver.
///
/// On the segment `x(s) = ax·ds³ + bx·ds² + cx·ds + dx` with
/// `ds = s - start`, and the same for `y`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SegmentCoefficients {
    pub ax: f64,
    pub bx: f64,
    pub cx: f64,
    pub dx: f64,
    pub ay: f64,
    pub by: f64,
    pub cy: f64,
    pub dy: f64,
    pub start: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplineError {
    #[error("At least 2 points are required to fit a spline, got {0}")]
    NotEnoughPoints(usize),

    #[error("Got {0} x coordinates but {1} y coordinates")]
    LengthMismatch(usize, usize),

    #[error("Point {0} is at the same location as the point before it")]
    RepeatedPoint(usize),

    #[error("The spline system could not be solved")]
    SingularSystem,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Spline2D {
    /// Fit a spline through the waypoints `(x[i], y[i])`.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch(x.len(), y.len()));
        }

        let s = chord_lengths(x, y);

        Ok(Self {
            x: CubicSpline::fit(&s, x)?,
            y: CubicSpline::fit(&s, y)?,
        })
    }

    pub fn from_path(path: &ReferencePath) -> Result<Self, SplineError> {
        Self::new(&path.x, &path.y)
    }

    pub fn num_segments(&self) -> usize {
        self.x.num_segments()
    }

    /// Total arclength of the spline.
    pub fn parameter_length(&self) -> f64 {
        self.x.knots().last().copied().unwrap_or(0.0)
    }

    /// Arclength at which the given segment starts.
    pub fn segment_start(&self, index: usize) -> f64 {
        let knots = self.x.knots();
        knots[index.min(knots.len() - 1)]
    }

    /// Index of the segment containing the arclength `s`.
    pub fn segment_index(&self, s: f64) -> usize {
        self.x.segment_index(s)
    }

    pub fn get_point(&self, s: f64) -> Vector2<f64> {
        let s = self.clamp_s(s);
        Vector2::new(self.x.eval(s), self.y.eval(s))
    }

    /// Derivative of the curve with respect to arclength.
    pub fn get_velocity(&self, s: f64) -> Vector2<f64> {
        let s = self.clamp_s(s);
        Vector2::new(self.x.deriv(s), self.y.deriv(s))
    }

    /// Unit normal pointing to the left of the direction of travel.
    pub fn get_orthogonal(&self, s: f64) -> Vector2<f64> {
        let v = self.get_velocity(s);
        let n = Vector2::new(-v.y, v.x);
        let norm = n.norm();

        if norm > 0.0 {
            n / norm
        } else {
            n
        }
    }

    pub fn get_coefficients(&self, index: usize) -> SegmentCoefficients {
        let x = self.x.segment(index);
        let y = self.y.segment(index);

        SegmentCoefficients {
            ax: x.a,
            bx: x.b,
            cx: x.c,
            dx: x.d,
            ay: y.a,
            by: y.b,
            cy: y.c,
            dy: y.d,
            start: self.segment_start(index),
        }
    }

    /// Find the point on the curve closest to `point`.
    ///
    /// If `hint` is given only the segments from one before the hint up to
    /// `window` segments after it are searched, otherwise the whole curve is.
    /// Returns the segment index and arclength of the closest point.
    pub fn find_closest_point(
        &self,
        point: &Vector2<f64>,
        hint: Option<usize>,
        window: usize,
    ) -> (usize, f64) {
        let last = self.num_segments() - 1;
        let (first_seg, last_seg) = match hint {
            Some(h) => {
                let h = h.min(last);
                (h.saturating_sub(1), (h + window).min(last))
            }
            None => (0, last),
        };

        let dist_sq = |s: f64| (self.get_point(s) - point).norm_squared();

        // Coarse sampling over the candidate segments
        let mut best_s = self.segment_start(first_seg);
        let mut best_d = dist_sq(best_s);
        for seg in first_seg..=last_seg {
            let start = self.segment_start(seg);
            let len = self.segment_start(seg + 1) - start;

            for j in 1..=CLOSEST_SAMPLES_PER_SEGMENT {
                let s = start + len * j as f64 / CLOSEST_SAMPLES_PER_SEGMENT as f64;
                let d = dist_sq(s);
                if d < best_d {
                    best_d = d;
                    best_s = s;
                }
            }
        }

        // Refine within the searched range with a shrinking step
        let lower = self.segment_start(first_seg);
        let upper = self.segment_start(last_seg + 1);
        let mut step = (upper - lower) / (CLOSEST_SAMPLES_PER_SEGMENT * (last_seg - first_seg + 1)) as f64;

        for _ in 0..CLOSEST_REFINE_ITERS {
            let mut moved = false;
            for &candidate in &[best_s - step, best_s + step] {
                let candidate = clamp(candidate, lower, upper);
                let d = dist_sq(candidate);
                if d < best_d {
                    best_d = d;
                    best_s = candidate;
                    moved = true;
                }
            }

            if !moved {
                step *= 0.5;
            }
        }

        (self.segment_index(best_s), best_s)
    }

    fn clamp_s(&self, s: f64) -> f64 {
        clamp(s, 0.0, self.parameter_length())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Cumulative distance along the polyline through the points.
fn chord_lengths(x: &[f64], y: &[f64]) -> Vec<f64> {
    let mut s = Vec::with_capacity(x.len());
    let mut total = 0.0;

    for i in 0..x.len() {
        if i > 0 {
            total += (x[i] - x[i - 1]).hypot(y[i] - y[i - 1]);
        }
        s.push(total);
    }

    s
}
