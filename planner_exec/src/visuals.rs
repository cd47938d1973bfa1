//! # Debug visualisation
//!
//! Modules and the planner push geometric markers to a [`VisualsSink`] under a
//! named topic. The sink is write only, nothing in the planner reads it back.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use log::debug;
use nalgebra::Vector2;
use serde::Serialize;

use crate::data::{Disc, DynamicObstacle, Halfspace, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sink which logs a summary of every publication.
#[derive(Debug, Default)]
pub struct LogVisuals;

/// Sink which keeps the most recent markers of every topic.
#[derive(Debug, Default)]
pub struct RecordingVisuals {
    pub topics: BTreeMap<String, Vec<Marker>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Marker {
    Point {
        position: Vector2<f64>,
        scale: f64,
        shape: Shape,
        color_index: usize,
    },
    Line {
        from: Vector2<f64>,
        to: Vector2<f64>,
        width: f64,
        color_index: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shape {
    Cube,
    Cylinder,
    Sphere,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination for debug markers.
pub trait VisualsSink {
    /// Publish the markers of a topic, replacing what was previously
    /// published on it.
    fn publish(&mut self, topic: &str, markers: Vec<Marker>);
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisualsSink for LogVisuals {
    fn publish(&mut self, topic: &str, markers: Vec<Marker>) {
        debug!("[visuals] {}: {} markers", topic, markers.len());
    }
}

impl RecordingVisuals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers last published on a topic, empty if it was never published.
    pub fn get(&self, topic: &str) -> &[Marker] {
        self.topics.get(topic).map(|m| m.as_slice()).unwrap_or(&[])
    }
}

impl VisualsSink for RecordingVisuals {
    fn publish(&mut self, topic: &str, markers: Vec<Marker>) {
        self.topics.insert(topic.to_string(), markers);
    }
}

impl Marker {
    pub fn point(position: Vector2<f64>, scale: f64, shape: Shape, color_index: usize) -> Self {
        Marker::Point {
            position,
            scale,
            shape,
            color_index,
        }
    }

    pub fn line(from: Vector2<f64>, to: Vector2<f64>, width: f64, color_index: usize) -> Self {
        Marker::Line {
            from,
            to,
            width,
            color_index,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Lines joining consecutive points of a trajectory.
pub fn trajectory_markers(trajectory: &Trajectory, width: f64, color_index: usize) -> Vec<Marker> {
    trajectory
        .positions
        .windows(2)
        .map(|w| Marker::line(w[0], w[1], width, color_index))
        .collect()
}

/// One cylinder per obstacle at its current position, sized by its radius.
/// Dummy obstacles are skipped.
pub fn obstacle_markers(obstacles: &[DynamicObstacle]) -> Vec<Marker> {
    obstacles
        .iter()
        .filter(|o| !o.is_dummy())
        .map(|o| Marker::point(o.position, 2.0 * o.radius, Shape::Cylinder, 0))
        .collect()
}

/// The predicted positions of every obstacle, sized by their uncertainty.
pub fn prediction_markers(obstacles: &[DynamicObstacle], draw_every: usize) -> Vec<Marker> {
    let every = draw_every.max(1);

    obstacles
        .iter()
        .filter(|o| !o.is_dummy())
        .enumerate()
        .flat_map(|(i, o)| {
            o.prediction
                .steps
                .iter()
                .step_by(every)
                .map(move |s| {
                    Marker::point(s.position, 2.0 * (o.radius + s.major_radius), Shape::Sphere, i)
                })
        })
        .collect()
}

/// A segment of the boundary of a half-plane, centred on the point of the
/// boundary closest to `near`.
///
/// Returns `None` for constraints which have no boundary.
pub fn halfspace_marker(
    halfspace: &Halfspace,
    near: Vector2<f64>,
    length: f64,
    width: f64,
    color_index: usize,
) -> Option<Marker> {
    let norm = halfspace.a.norm();
    if norm == 0.0 {
        return None;
    }

    let n = halfspace.a / norm;
    let centre = near - n * (halfspace.evaluate(&near) / norm);
    let along = Vector2::new(-n.y, n.x) * (length / 2.0);

    Some(Marker::line(centre - along, centre + along, width, color_index))
}

/// The discs of the robot at the given pose.
pub fn robot_area_markers(pos: Vector2<f64>, psi: f64, discs: &[Disc]) -> Vec<Marker> {
    discs
        .iter()
        .map(|d| Marker::point(d.position(pos, psi), 2.0 * d.radius, Shape::Cylinder, 1))
        .collect()
}
