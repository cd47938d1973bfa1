//! Real-time data owned by the planner
//!
//! Holds everything that arrives from outside the planner between cycles: the
//! current obstacle set, the reference path, the goal and the recent history of
//! the robot's position. The robot's disc decomposition also lives here, it is
//! computed once from the robot dimensions and survives resets.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;

use nalgebra::Vector2;
use serde::Serialize;

use super::{DynamicObstacle, ReferencePath};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A circle approximating a longitudinal slice of the robot footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Disc {
    /// Index of the disc, 0 is the rearmost.
    pub id: usize,

    /// Longitudinal offset from the robot's reference point.
    ///
    /// Units: meters
    pub offset: f64,

    /// Units: meters
    pub radius: f64,
}

/// A bounded history of positions, the oldest entry is dropped once full.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSizeTrajectory {
    positions: VecDeque<Vector2<f64>>,
    capacity: usize,
}

/// Aggregate of all externally supplied data used by a cycle.
#[derive(Debug, Clone)]
pub struct RealTimeData {
    /// Disc decomposition of the robot, kept across resets.
    pub robot_area: Vec<Disc>,

    pub past_trajectory: FixedSizeTrajectory,

    pub dynamic_obstacles: Vec<DynamicObstacle>,

    pub path: ReferencePath,

    pub goal: Vector2<f64>,

    pub goal_received: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Disc {
    pub fn new(id: usize, offset: f64, radius: f64) -> Self {
        Self { id, offset, radius }
    }

    /// Position of the disc centre for a robot at `pos` with heading `psi`.
    pub fn position(&self, pos: Vector2<f64>, psi: f64) -> Vector2<f64> {
        pos + Vector2::new(psi.cos(), psi.sin()) * self.offset
    }
}

impl FixedSizeTrajectory {
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, position: Vector2<f64>) {
        if self.capacity == 0 {
            return;
        }

        while self.positions.len() >= self.capacity {
            self.positions.pop_front();
        }

        self.positions.push_back(position);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate from the oldest to the newest position.
    pub fn iter(&self) -> impl Iterator<Item = &Vector2<f64>> {
        self.positions.iter()
    }
}

impl RealTimeData {
    /// Create new data for a robot of the given dimensions.
    pub fn new(length: f64, width: f64, n_discs: usize, past_trajectory_length: usize) -> Self {
        Self {
            robot_area: define_robot_area(length, width, n_discs),
            past_trajectory: FixedSizeTrajectory::new(past_trajectory_length),
            dynamic_obstacles: Vec::new(),
            path: ReferencePath::default(),
            goal: Vector2::zeros(),
            goal_received: false,
        }
    }

    /// Clear all dynamic data, keeping the robot discs.
    pub fn reset(&mut self) {
        self.past_trajectory.clear();
        self.dynamic_obstacles.clear();
        self.path.clear();
        self.goal = Vector2::zeros();
        self.goal_received = false;
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Approximate a rectangular robot footprint by `n_discs` discs.
///
/// A single disc sits at the reference point. Otherwise the first disc is at
/// the rear, the last at the front and the rest are spaced evenly between
/// them. Every disc has a radius of half the robot width.
pub fn define_robot_area(length: f64, width: f64, n_discs: usize) -> Vec<Disc> {
    let radius = width / 2.0;

    if n_discs <= 1 {
        return vec![Disc::new(0, 0.0, radius)];
    }

    let rear = -length / 2.0 + radius;
    let front = length / 2.0 - radius;
    let spacing = (front - rear) / (n_discs - 1) as f64;

    (0..n_discs)
        .map(|i| Disc::new(i, rear + spacing * i as f64, radius))
        .collect()
}
