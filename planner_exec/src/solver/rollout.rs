//! Kinematic rollout solver
//!
//! Stands in for a generated optimiser. Rather than optimising it rolls a
//! unicycle model forward over the horizon under a simple tracking law: the
//! robot steers towards a point a fixed distance ahead on the spline window it
//! was given, or towards the goal when there is no spline, and slows so that
//! it can stop at the goal. Input and speed limits are respected, constraint
//! parameters are accepted but not enforced.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use log::{trace, warn};
use nalgebra::Vector2;

use util::maths::{clamp, wrap_to_pi};

use super::{ExitCode, Solver};
use crate::data::{state, State};
use crate::modules::{contouring, gaussian_constraints, road_constraints};
use crate::params::{PlannerParams, RolloutParams};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Input names, in addition to the state fields.
const ACCELERATION: &str = "a";
const ANGULAR_VELOCITY: &str = "w";

/// Parameters every configuration of the solver accepts.
const BASE_PARAMETERS: [&str; 8] = [
    "acceleration",
    "angular_velocity",
    "goal_x",
    "goal_y",
    "goal_weight",
    "contour",
    "lag",
    "ego_disc_radius",
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Solver variables of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Stage {
    x: f64,
    y: f64,
    psi: f64,
    v: f64,
    spline: f64,
    a: f64,
    w: f64,
}

/// A solver which rolls a unicycle forward under a tracking law.
pub struct RolloutSolver {
    horizon: usize,
    dt: f64,
    limits: RolloutParams,
    num_segments: usize,

    params: Vec<HashMap<String, f64>>,
    schema: HashSet<String>,

    xinit: Stage,

    /// Initial guess being prepared.
    warmstart: Vec<Stage>,

    /// The solution, seeded with the initial guess on load.
    output: Vec<Stage>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Stage {
    fn from_state(state: &State) -> Self {
        Self {
            x: state.get(state::X),
            y: state.get(state::Y),
            psi: state.get(state::PSI),
            v: state.get(state::V),
            spline: state.get(state::SPLINE),
            a: 0.0,
            w: 0.0,
        }
    }

    fn get(&self, name: &str) -> Option<f64> {
        match name {
            state::X => Some(self.x),
            state::Y => Some(self.y),
            state::PSI => Some(self.psi),
            state::V => Some(self.v),
            state::SPLINE => Some(self.spline),
            ACCELERATION => Some(self.a),
            ANGULAR_VELOCITY => Some(self.w),
            _ => None,
        }
    }

    fn pos(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    fn is_finite(&self) -> bool {
        [self.x, self.y, self.psi, self.v, self.spline, self.a, self.w]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Integrate the unicycle over one step with this stage's inputs.
    fn step(&self, dt: f64, max_speed: f64) -> Self {
        let v = clamp(self.v + self.a * dt, 0.0, max_speed);

        Self {
            x: self.x + self.v * self.psi.cos() * dt,
            y: self.y + self.v * self.psi.sin() * dt,
            psi: wrap_to_pi(self.psi + self.w * dt),
            v,
            spline: self.spline + self.v * dt,
            a: 0.0,
            w: 0.0,
        }
    }
}

impl RolloutSolver {
    pub fn new(params: &PlannerParams) -> Self {
        let horizon = params.horizon;

        let mut schema: HashSet<String> = BASE_PARAMETERS.iter().map(|s| s.to_string()).collect();

        for i in 0..params.contouring.num_segments {
            for coeff in contouring::SPLINE_COEFFICIENTS.iter() {
                schema.insert(contouring::spline_param(i, coeff));
            }
        }

        for h in 0..road_constraints::NUM_CONSTRAINTS {
            for field in road_constraints::CONSTRAINT_FIELDS.iter() {
                schema.insert(road_constraints::constraint_param(h, field));
            }
        }

        for d in 0..params.robot.n_discs {
            schema.insert(gaussian_constraints::disc_offset_param(d));
        }

        for i in 0..params.max_obstacles {
            for field in gaussian_constraints::OBSTACLE_FIELDS.iter() {
                schema.insert(gaussian_constraints::obstacle_param(i, field));
            }
        }

        Self {
            horizon,
            dt: params.integrator_step,
            limits: params.rollout.clone(),
            num_segments: params.contouring.num_segments,
            params: vec![HashMap::new(); horizon],
            schema,
            xinit: Stage::default(),
            warmstart: vec![Stage::default(); horizon],
            output: vec![Stage::default(); horizon],
        }
    }

    /// Add a parameter to the schema reported by `has_parameter`.
    pub fn declare_parameter(&mut self, name: &str) {
        self.schema.insert(name.to_string());
    }

    /// Value of a parameter at stage `k`, if it has been set.
    pub fn get_parameter(&self, k: usize, name: &str) -> Option<f64> {
        self.params.get(k)?.get(name).copied()
    }

    /// Point to track at stage `k`, and the distance over which the robot
    /// should come to a stop.
    fn target(&self, k: usize, stage: &Stage) -> Option<(Vector2<f64>, f64)> {
        let goal = match (self.get_parameter(k, "goal_x"), self.get_parameter(k, "goal_y")) {
            (Some(x), Some(y)) => Some(Vector2::new(x, y)),
            _ => None,
        };
        let stop_dist = goal
            .map(|g| (g - stage.pos()).norm())
            .unwrap_or(std::f64::INFINITY);

        match self.window_point(k, stage.spline + self.limits.lookahead_m) {
            Some(p) => Some((p, stop_dist)),
            None => goal.map(|g| (g, stop_dist)),
        }
    }

    /// Evaluate the spline window passed in the parameters of stage `k`.
    fn window_point(&self, k: usize, s: f64) -> Option<Vector2<f64>> {
        let param = |i: usize, c: &str| self.get_parameter(k, &contouring::spline_param(i, c));

        // Last window segment starting at or before s
        let mut segment = 0;
        param(0, "start")?;
        for i in 1..self.num_segments {
            match param(i, "start") {
                Some(start) if start <= s => segment = i,
                _ => break,
            }
        }

        let c = |name: &str| param(segment, name).unwrap_or(0.0);
        let ds = s - c("start");
        let eval = |a: f64, b: f64, cc: f64, d: f64| ((a * ds + b) * ds + cc) * ds + d;

        Some(Vector2::new(
            eval(c("ax"), c("bx"), c("cx"), c("dx")),
            eval(c("ay"), c("by"), c("cy"), c("dy")),
        ))
    }
}

impl Solver for RolloutSolver {
    fn horizon(&self) -> usize {
        self.horizon
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn set_parameter(&mut self, k: usize, name: &str, value: f64) {
        match self.params.get_mut(k) {
            Some(stage) => {
                stage.insert(name.to_string(), value);
            }
            None => warn!("Parameter {} set for stage {} beyond the horizon", name, k),
        }
    }

    fn has_parameter(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    fn set_xinit(&mut self, state: &State) {
        self.xinit = Stage::from_state(state);
    }

    fn initialize_with_state(&mut self, state: &State) {
        let stage = Stage::from_state(state);
        for s in self.warmstart.iter_mut() {
            *s = stage;
        }
    }

    fn initialize_warmstart(&mut self, state: &State, shift_forward: bool) {
        let n = self.horizon;
        for k in 0..n {
            let src = if shift_forward { (k + 1).min(n - 1) } else { k };
            self.warmstart[k] = self.output[src];
        }

        if let Some(first) = self.warmstart.first_mut() {
            *first = Stage::from_state(state);
        }
    }

    fn load_warmstart(&mut self) {
        self.output.clone_from(&self.warmstart);
    }

    fn solve(&mut self) -> ExitCode {
        let n = self.horizon;
        let lim = &self.limits;

        self.output[0] = self.xinit;

        for k in 0..n - 1 {
            let mut stage = self.output[k];

            let (target, stop_dist) = match self.target(k, &stage) {
                Some(t) => t,
                None => return ExitCode::INVALID_PARAMETERS,
            };

            let to_target = target - stage.pos();
            let heading_err = wrap_to_pi(to_target.y.atan2(to_target.x) - stage.psi);

            // Slow down to stop at the goal and while turning
            let v_des = lim
                .max_speed
                .min((2.0 * lim.max_acceleration * stop_dist).sqrt())
                * heading_err.cos().max(0.0);

            stage.a = clamp((v_des - stage.v) / self.dt, -lim.max_acceleration, lim.max_acceleration);
            stage.w = clamp(
                lim.heading_gain * heading_err,
                -lim.max_angular_velocity,
                lim.max_angular_velocity,
            );

            self.output[k] = stage;
            self.output[k + 1] = stage.step(self.dt, lim.max_speed);
        }

        if !self.output.iter().all(Stage::is_finite) {
            return ExitCode::NUMERICAL_FAILURE;
        }

        trace!(
            "Rollout end: ({:.3}, {:.3}) at {:.3} m/s",
            self.output[n - 1].x,
            self.output[n - 1].y,
            self.output[n - 1].v
        );

        ExitCode::SUCCESS
    }

    fn get_output(&self, k: usize, name: &str) -> Option<f64> {
        self.output.get(k)?.get(name)
    }

    fn get_ego_prediction(&self, k: usize, name: &str) -> f64 {
        self.warmstart
            .get(k)
            .and_then(|s| s.get(name))
            .unwrap_or(0.0)
    }

    fn reset(&mut self) {
        for stage in self.params.iter_mut() {
            stage.clear();
        }

        self.xinit = Stage::default();
        for s in self.warmstart.iter_mut().chain(self.output.iter_mut()) {
            *s = Stage::default();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::test::default_params;

    fn state_at(x: f64, y: f64, psi: f64) -> State {
        let mut state = State::new();
        state.set(state::X, x);
        state.set(state::Y, y);
        state.set(state::PSI, psi);
        state
    }

    #[test]
    fn test_no_target() {
        let mut solver = RolloutSolver::new(&default_params());
        solver.set_xinit(&State::new());

        assert_eq!(solver.solve(), ExitCode::INVALID_PARAMETERS);
    }

    #[test]
    fn test_drives_to_goal() {
        let params = default_params();
        let mut solver = RolloutSolver::new(&params);
        let state = state_at(0.0, 0.0, 0.0);

        for k in 0..solver.horizon() {
            solver.set_parameter(k, "goal_x", 0.0);
            solver.set_parameter(k, "goal_y", 2.0);
        }
        solver.initialize_with_state(&state);
        solver.set_xinit(&state);
        solver.load_warmstart();

        assert_eq!(solver.solve(), ExitCode::SUCCESS);

        let n = solver.horizon();
        let end = Vector2::new(
            solver.get_output(n - 1, "x").unwrap(),
            solver.get_output(n - 1, "y").unwrap(),
        );
        assert!((end - Vector2::new(0.0, 2.0)).norm() < 2.0);

        // Inputs stay within their limits
        for k in 0..n {
            assert!(solver.get_output(k, "w").unwrap().abs() <= params.rollout.max_angular_velocity);
            assert!(solver.get_output(k, "v").unwrap() <= params.rollout.max_speed);
        }

        assert_eq!(solver.get_output(0, "gamma"), None);
        assert_eq!(solver.get_output(n, "x"), None);
    }

    #[test]
    fn test_schema() {
        let mut solver = RolloutSolver::new(&default_params());

        assert!(solver.has_parameter("spline0_ax"));
        assert!(solver.has_parameter("lin_constraint_1_b"));
        assert!(solver.has_parameter("gaussian_obst_0_major"));
        assert!(!solver.has_parameter("preview"));

        solver.declare_parameter("preview");
        assert!(solver.has_parameter("preview"));
    }

    #[test]
    fn test_shifted_warmstart() {
        let mut solver = RolloutSolver::new(&default_params());
        let state = state_at(0.0, 0.0, 0.0);

        for k in 0..solver.horizon() {
            solver.set_parameter(k, "goal_x", 5.0);
            solver.set_parameter(k, "goal_y", 0.0);
        }
        solver.initialize_with_state(&state);
        solver.set_xinit(&state);
        solver.load_warmstart();
        assert!(solver.solve().is_success());

        let v2 = solver.get_output(2, "v").unwrap();
        solver.initialize_warmstart(&state, true);

        assert_eq!(solver.get_ego_prediction(0, "v"), 0.0);
        assert_eq!(solver.get_ego_prediction(1, "v"), v2);

        solver.reset();
        assert_eq!(solver.get_parameter(0, "goal_x"), None);
        assert_eq!(solver.get_ego_prediction(1, "v"), 0.0);
    }
}
