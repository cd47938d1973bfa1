//! # Contouring objective
//!
//! Tracks the reference path. A spline is fitted through the path whenever a
//! new one arrives, and every cycle the closest point on it to the robot is
//! found. The progress of that point along the spline becomes the initial
//! value of the solver's `spline` state.
//!
//! The solver gets a window of the upcoming spline segments so it can follow
//! the curve ahead of the robot. This module also builds the road corridor,
//! two half-planes per stage parallel to the path, which
//! [`super::RoadConstraints`] passes to the solver.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use nalgebra::Vector2;

use util::logger::Throttle;

use crate::data::{state, Halfspace, ModuleData, RealTimeData, State};
use crate::params::PlannerParams;
use crate::solver::Solver;
use crate::spline::{SegmentCoefficients, Spline2D};
use crate::visuals::{halfspace_marker, Marker, Shape, VisualsSink};

use super::{ControllerModule, ModuleType};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Coefficient names of each entry in the spline window.
pub const SPLINE_COEFFICIENTS: [&str; 9] = ["ax", "bx", "cx", "dx", "ay", "by", "cy", "dy", "start"];

/// Number of segments past the previous closest segment searched for the new
/// closest point.
const SEARCH_WINDOW: usize = 3;

/// Period of the warning emitted when the window runs past the spline end.
const BEYOND_WARN_PERIOD_MS: u64 = 3000;

/// Spacing of the samples used to draw the spline.
///
/// Units: meters
const DRAW_STEP_M: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Contouring {
    spline: Option<Spline2D>,

    /// Segment closest to the robot in the last update, `None` if the whole
    /// spline must be searched.
    closest_segment: Option<usize>,

    num_segments: usize,
    contour_weight: f64,
    lag_weight: f64,
    preview_weight: f64,

    road_width_half: f64,
    two_way: bool,

    /// Spline points at which the corridor was built, for drawing.
    corridor_points: Vec<Vector2<f64>>,

    beyond_throttle: Throttle,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Contouring {
    pub fn new(params: &PlannerParams) -> Self {
        Self {
            spline: None,
            closest_segment: None,
            num_segments: params.contouring.num_segments,
            contour_weight: params.weights.contour,
            lag_weight: params.weights.lag,
            preview_weight: params.weights.preview,
            road_width_half: params.road.width / 2.0,
            two_way: params.road.two_way,
            corridor_points: Vec::new(),
            beyond_throttle: Throttle::from_millis(BEYOND_WARN_PERIOD_MS),
        }
    }

    pub fn closest_segment(&self) -> Option<usize> {
        self.closest_segment
    }

    /// Build the corridor half-planes for every stage.
    ///
    /// Stage `k` is bounded at the solver's predicted progress for stage
    /// `k + 1`. The left boundary is offset by `width_times * w/2 - r` along
    /// the left normal, the right one by `w/2 - r` along the right normal.
    fn road_constraints(
        spline: &Spline2D,
        road_width_half: f64,
        two_way: bool,
        robot_radius: f64,
        solver: &dyn Solver,
    ) -> (Vec<Vec<Halfspace>>, Vec<Vector2<f64>>) {
        let n = solver.horizon();
        let width_times = if two_way { 3.0 } else { 1.0 };

        let mut constraints = Vec::with_capacity(n);
        let mut points = Vec::with_capacity(n);

        for k in 0..n {
            let cur_s = solver.get_ego_prediction((k + 1).min(n - 1), state::SPLINE);
            let point = spline.get_point(cur_s);
            let normal = spline.get_orthogonal(cur_s);

            let left = point + normal * (width_times * road_width_half - robot_radius);
            let right = point - normal * (road_width_half - robot_radius);

            constraints.push(vec![
                Halfspace::new(normal, normal.dot(&left)),
                Halfspace::new(-normal, -normal.dot(&right)),
            ]);
            points.push(point);
        }

        (constraints, points)
    }

    /// Coefficients of the window entry at the given segment index.
    ///
    /// Past the end of the spline the last segment is used with its higher
    /// order terms zeroed, so the window holds still at the end of the path.
    fn window_coefficients(
        spline: &Spline2D,
        index: usize,
        throttle: &mut Throttle,
    ) -> SegmentCoefficients {
        if index < spline.num_segments() {
            return spline.get_coefficients(index);
        }

        if throttle.ready() {
            warn!("The spline window extends beyond the end of the path");
        }

        let end = spline.get_point(spline.parameter_length());

        SegmentCoefficients {
            dx: end.x,
            dy: end.y,
            start: spline.parameter_length(),
            ..SegmentCoefficients::default()
        }
    }
}

impl ControllerModule for Contouring {
    fn name(&self) -> &str {
        "contouring"
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::Objective
    }

    fn is_data_ready(&self, data: &RealTimeData, missing_data: &mut String) -> bool {
        if data.path.is_empty() {
            missing_data.push_str("Reference Path ");
            return false;
        }

        if self.spline.is_none() {
            missing_data.push_str("Reference Spline ");
            return false;
        }

        true
    }

    fn update(
        &mut self,
        state: &mut State,
        data: &RealTimeData,
        module_data: &mut ModuleData,
        solver: &dyn Solver,
    ) {
        let spline = match &self.spline {
            Some(s) => s,
            None => return,
        };

        let (segment, progress) =
            spline.find_closest_point(&state.pos(), self.closest_segment, SEARCH_WINDOW);
        self.closest_segment = Some(segment);

        state.set(state::SPLINE, progress);

        let robot_radius = data.robot_area.first().map(|d| d.radius).unwrap_or(0.0);
        let (constraints, points) = Self::road_constraints(
            spline,
            self.road_width_half,
            self.two_way,
            robot_radius,
            solver,
        );

        module_data.static_obstacles = constraints;
        self.corridor_points = points;
    }

    fn set_parameters(
        &mut self,
        solver: &mut dyn Solver,
        _data: &RealTimeData,
        _module_data: &ModuleData,
        k: usize,
    ) {
        solver.set_parameter(k, "contour", self.contour_weight);
        solver.set_parameter(k, "lag", self.lag_weight);

        if solver.has_parameter("preview") {
            solver.set_parameter(k, "preview", self.preview_weight);
        }

        let spline = match &self.spline {
            Some(s) => s,
            None => return,
        };
        let closest = self.closest_segment.unwrap_or(0);

        for i in 0..self.num_segments {
            let c = Self::window_coefficients(spline, closest + i, &mut self.beyond_throttle);
            let values = [c.ax, c.bx, c.cx, c.dx, c.ay, c.by, c.cy, c.dy, c.start];

            for (name, value) in SPLINE_COEFFICIENTS.iter().zip(values.iter()) {
                solver.set_parameter(k, &spline_param(i, name), *value);
            }
        }
    }

    fn visualize(&self, data: &RealTimeData, module_data: &ModuleData, visuals: &mut dyn VisualsSink) {
        let spline = match &self.spline {
            Some(s) => s,
            None => return,
        };

        let closest = self.closest_segment.unwrap_or(0);
        visuals.publish(
            "contouring/current",
            vec![Marker::point(
                spline.get_point(spline.segment_start(closest)),
                0.3,
                Shape::Cube,
                10,
            )],
        );

        visuals.publish(
            "contouring/points",
            (0..data.path.len())
                .filter_map(|i| data.path.point(i))
                .map(|p| Marker::point(p, 0.15, Shape::Cylinder, 0))
                .collect(),
        );

        let num_samples = (spline.parameter_length() / DRAW_STEP_M).ceil() as usize;
        let samples: Vec<Vector2<f64>> = (0..=num_samples)
            .map(|i| spline.get_point(i as f64 * DRAW_STEP_M))
            .collect();
        visuals.publish(
            "contouring/path",
            samples
                .windows(2)
                .map(|w| Marker::line(w[0], w[1], 0.1, 5))
                .collect(),
        );

        let mut corridor = Vec::new();
        for (k, halfspaces) in module_data.static_obstacles.iter().enumerate() {
            let near = match self.corridor_points.get(k) {
                Some(p) => *p,
                None => continue,
            };

            corridor.extend(
                halfspaces
                    .iter()
                    .filter_map(|h| halfspace_marker(h, near, 0.5, 0.1, k)),
            );
        }
        visuals.publish("contouring/road_constraints", corridor);
    }

    fn reset(&mut self) {
        self.spline = None;
        self.closest_segment = None;
        self.corridor_points.clear();
    }

    fn on_data_received(&mut self, data: &RealTimeData, data_name: &str) {
        if data_name != "reference_path" {
            return;
        }

        info!("Received reference path with {} points", data.path.len());

        match Spline2D::from_path(&data.path) {
            Ok(s) => self.spline = Some(s),
            Err(e) => {
                warn!("Cannot fit a spline to the reference path: {}", e);
                self.spline = None;
            }
        }

        self.closest_segment = None;
    }

    fn is_objective_reached(&self, _data: &RealTimeData) -> bool {
        match &self.spline {
            Some(s) => {
                self.closest_segment.unwrap_or(0) + self.num_segments - 1 >= s.num_segments()
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Name of a coefficient of the `i`th spline window entry.
pub fn spline_param(i: usize, coefficient: &str) -> String {
    format!("spline{}_{}", i, coefficient)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::ReferencePath;
    use crate::params::test::default_params;
    use crate::solver::RolloutSolver;
    use crate::visuals::RecordingVisuals;
    use approx::assert_relative_eq;

    fn straight_data(n_points: usize) -> RealTimeData {
        let mut data = RealTimeData::new(0.65, 0.5, 1, 10);
        data.path = ReferencePath::new(
            (0..n_points).map(|i| i as f64).collect(),
            vec![0.0; n_points],
        );
        data
    }

    fn state_at(x: f64, y: f64) -> State {
        let mut state = State::new();
        state.set(state::X, x);
        state.set(state::Y, y);
        state
    }

    /// Run a contouring update for a robot at the given position.
    fn update_at(
        module: &mut Contouring,
        solver: &mut RolloutSolver,
        data: &RealTimeData,
        x: f64,
        y: f64,
    ) -> (State, ModuleData) {
        let mut state = state_at(x, y);
        let mut module_data = ModuleData::new();

        solver.initialize_with_state(&state);
        module.update(&mut state, data, &mut module_data, &*solver);

        (state, module_data)
    }

    #[test]
    fn test_readiness() {
        let params = default_params();
        let mut module = Contouring::new(&params);
        let mut data = RealTimeData::new(0.65, 0.5, 1, 10);

        let mut missing = String::new();
        assert!(!module.is_data_ready(&data, &mut missing));
        assert_eq!(missing, "Reference Path ");

        data.path = ReferencePath::new(vec![0.0, 1.0], vec![0.0, 0.0]);
        let mut missing = String::new();
        assert!(!module.is_data_ready(&data, &mut missing));

        module.on_data_received(&data, "reference_path");
        let mut missing = String::new();
        assert!(module.is_data_ready(&data, &mut missing));
        assert!(missing.is_empty());
    }

    #[test]
    fn test_update_sets_progress() {
        let params = default_params();
        let mut module = Contouring::new(&params);
        let mut solver = RolloutSolver::new(&params);
        let data = straight_data(4);
        module.on_data_received(&data, "reference_path");

        let (state, _) = update_at(&mut module, &mut solver, &data, 1.5, 0.3);

        assert_relative_eq!(state.get(state::SPLINE), 1.5, epsilon = 1e-6);
        assert_eq!(module.closest_segment(), Some(1));
    }

    #[test]
    fn test_corridor_contains_robot() {
        let params = default_params();
        let mut module = Contouring::new(&params);
        let mut solver = RolloutSolver::new(&params);
        let data = straight_data(4);
        module.on_data_received(&data, "reference_path");

        let (state, module_data) = update_at(&mut module, &mut solver, &data, 0.5, 1.0);

        assert_eq!(module_data.static_obstacles.len(), params.horizon);
        for halfspaces in &module_data.static_obstacles {
            assert_eq!(halfspaces.len(), 2);
            assert!(halfspaces.iter().all(|h| h.contains(&state.pos())));
        }

        // Left boundary at w/2 - r = 1.75
        let (state, module_data) = update_at(&mut module, &mut solver, &data, 0.5, 1.8);
        assert!(!module_data.static_obstacles[0][0].contains(&state.pos()));
        assert!(module_data.static_obstacles[0][1].contains(&state.pos()));
    }

    #[test]
    fn test_two_way_corridor() {
        let mut params = default_params();
        params.road.two_way = true;
        let mut module = Contouring::new(&params);
        let mut solver = RolloutSolver::new(&params);
        let data = straight_data(4);
        module.on_data_received(&data, "reference_path");

        // Left boundary at 3w/2 - r = 5.75, right at -(w/2 - r) = -1.75
        let (state, module_data) = update_at(&mut module, &mut solver, &data, 1.0, 4.0);
        assert!(module_data.static_obstacles[0].iter().all(|h| h.contains(&state.pos())));

        let (state, module_data) = update_at(&mut module, &mut solver, &data, 1.0, -2.0);
        assert!(!module_data.static_obstacles[0][1].contains(&state.pos()));
    }

    #[test]
    fn test_objective_reached() {
        let params = default_params();
        let mut module = Contouring::new(&params);
        let mut solver = RolloutSolver::new(&params);

        // 5 segments with a window of 3, reached once the closest segment is 3
        let data = straight_data(6);
        module.on_data_received(&data, "reference_path");
        assert!(!module.is_objective_reached(&data));

        for (x, reached) in [(0.5, false), (1.5, false), (2.5, false), (3.5, true), (4.5, true)].iter() {
            update_at(&mut module, &mut solver, &data, *x, 0.0);
            assert_eq!(module.is_objective_reached(&data), *reached, "x = {}", x);
        }

        module.reset();
        assert!(!module.is_objective_reached(&data));
    }

    #[test]
    fn test_window_beyond_spline() {
        let params = default_params();
        let mut module = Contouring::new(&params);
        let mut solver = RolloutSolver::new(&params);
        let data = straight_data(4);
        module.on_data_received(&data, "reference_path");

        // Closest segment is the last of 3
        let (_, module_data) = update_at(&mut module, &mut solver, &data, 2.5, 0.0);
        module.set_parameters(&mut solver, &data, &module_data, 1);

        assert_eq!(solver.get_parameter(1, "spline0_start"), Some(2.0));
        for i in 1..params.contouring.num_segments {
            let p = |c: &str| solver.get_parameter(1, &spline_param(i, c)).unwrap();
            assert_eq!(p("ax"), 0.0);
            assert_eq!(p("bx"), 0.0);
            assert_eq!(p("cx"), 0.0);
            assert_relative_eq!(p("dx"), 3.0, epsilon = 1e-9);
            assert_relative_eq!(p("dy"), 0.0, epsilon = 1e-9);
            assert_relative_eq!(p("start"), 3.0, epsilon = 1e-9);
        }

        assert_eq!(solver.get_parameter(1, "preview"), None);
        solver.declare_parameter("preview");
        module.set_parameters(&mut solver, &data, &module_data, 1);
        assert_eq!(solver.get_parameter(1, "preview"), Some(params.weights.preview));
    }

    #[test]
    fn test_visualize() {
        let params = default_params();
        let mut module = Contouring::new(&params);
        let mut solver = RolloutSolver::new(&params);
        let data = straight_data(4);
        module.on_data_received(&data, "reference_path");

        let (_, module_data) = update_at(&mut module, &mut solver, &data, 0.5, 0.0);
        let mut visuals = RecordingVisuals::new();
        module.visualize(&data, &module_data, &mut visuals);

        assert_eq!(visuals.get("contouring/points").len(), 4);
        assert_eq!(visuals.get("contouring/path").len(), 6);
        assert_eq!(visuals.get("contouring/road_constraints").len(), 2 * params.horizon);
    }
}
