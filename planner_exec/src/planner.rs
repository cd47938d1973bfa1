//! # Planner
//!
//! Runs one decision cycle of the MPC: checks every module has its data,
//! warm starts the solver, lets modules update and write their parameters,
//! solves and extracts the planned trajectory.
//!
//! A cycle which fails because of missing data or an unsuccessful solve is not
//! an error, it produces a failed [`PlannerOutput`] and the next cycle tries
//! again from scratch.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};

use util::logger::Throttle;

use crate::data::{
    state, ModuleData, PlanFailure, PlannerOutput, RealTimeData, State, Trajectory,
};
use crate::modules::{build_modules, ControllerModule, ModuleType};
use crate::params::{PlannerError, PlannerParams};
use crate::solver::{ExitCode, Solver};
use crate::visuals::{self, VisualsSink};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period of the missing data warning.
const MISSING_DATA_WARN_PERIOD_MS: u64 = 3000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The MPC planner, owns the solver and the modules.
pub struct Planner<S: Solver> {
    solver: S,
    modules: Vec<Box<dyn ControllerModule>>,

    output: PlannerOutput,
    module_data: ModuleData,

    shift_forward: bool,
    draw_every: usize,

    missing_data_throttle: Throttle,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: Solver> Planner<S> {
    /// Create a new planner with the modules listed in the parameters.
    pub fn new(params: &PlannerParams, solver: S) -> Result<Self, PlannerError> {
        Self::with_modules(params, solver, build_modules(params))
    }

    /// Create a new planner with the given modules, run in the given order.
    pub fn with_modules(
        params: &PlannerParams,
        mut solver: S,
        modules: Vec<Box<dyn ControllerModule>>,
    ) -> Result<Self, PlannerError> {
        params.validate()?;

        if solver.horizon() != params.horizon {
            return Err(PlannerError::HorizonMismatch {
                solver: solver.horizon(),
                params: params.horizon,
            });
        }

        solver.reset();

        info!("Planner initialised with {} modules:", modules.len());
        for module in modules.iter() {
            info!("    {} ({:?})", module.name(), module.module_type());
        }

        Ok(Self {
            output: PlannerOutput::new(solver.dt()),
            solver,
            modules,
            module_data: ModuleData::new(),
            shift_forward: params.shift_previous_solution_forward,
            draw_every: params.visualisation.draw_every,
            missing_data_throttle: Throttle::from_millis(MISSING_DATA_WARN_PERIOD_MS),
        })
    }

    /// Run one planning cycle.
    ///
    /// The state's `spline` field is updated with the progress along the
    /// reference path.
    pub fn solve_mpc(&mut self, state: &mut State, data: &RealTimeData) -> PlannerOutput {
        let was_feasible = self.output.success;
        let dt = self.solver.dt();
        let n = self.solver.horizon();

        self.module_data = ModuleData::new();

        // Every module is asked so that all missing data is reported
        let mut missing_data = String::new();
        let mut is_data_ready = true;
        for module in self.modules.iter() {
            is_data_ready &= module.is_data_ready(data, &mut missing_data);
        }

        if !is_data_ready {
            let missing_data = missing_data.trim_end().to_string();
            if self.missing_data_throttle.ready() {
                warn!("Data is not ready, missing {}", missing_data);
            }

            self.output = PlannerOutput::failed(dt, PlanFailure::MissingData(missing_data));
            return self.output.clone();
        }

        // Initial guess
        if was_feasible {
            self.solver.initialize_warmstart(state, self.shift_forward);
        } else {
            self.solver.initialize_with_state(state);
        }
        self.solver.set_xinit(state);

        for module in self.modules.iter_mut() {
            module.update(state, data, &mut self.module_data, &self.solver);
        }

        // Modules may have changed the state, in particular the progress
        self.solver.set_xinit(state);

        for k in 0..n {
            for module in self.modules.iter_mut() {
                if k == 0 && module.module_type() == ModuleType::Constraint {
                    continue;
                }

                module.set_parameters(&mut self.solver, data, &self.module_data, k);
            }
        }

        self.solver.load_warmstart();

        let mut exit_code = None;
        for module in self.modules.iter_mut() {
            exit_code = module.optimize(state, data, &self.module_data, &mut self.solver);
            if exit_code.is_some() {
                debug!("Solve replaced by the {} module", module.name());
                break;
            }
        }
        let exit_code = match exit_code {
            Some(c) => c,
            None => self.solver.solve(),
        };

        if !exit_code.is_success() {
            warn!("MPC did not find a solution, exit code {}", exit_code);
            self.output = PlannerOutput::failed(dt, PlanFailure::InfeasibleSolve(exit_code.0));
            return self.output.clone();
        }

        self.output = match self.extract_trajectory(dt, n) {
            Ok(t) => PlannerOutput::succeeded(t),
            Err(f) => {
                warn!("Cannot extract the planned trajectory: {}", f);
                PlannerOutput::failed(dt, f)
            }
        };

        self.output.clone()
    }

    /// Value of a solved variable at stage `k`.
    pub fn get_solution(&self, k: usize, name: &str) -> Option<f64> {
        self.solver.get_output(k, name)
    }

    /// The output of the last cycle.
    pub fn output(&self) -> &PlannerOutput {
        &self.output
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn modules(&self) -> &[Box<dyn ControllerModule>] {
        &self.modules
    }

    /// Notify every module that the named external data has changed.
    pub fn on_data_received(&mut self, data: &RealTimeData, data_name: &str) {
        for module in self.modules.iter_mut() {
            module.on_data_received(data, data_name);
        }
    }

    /// Publish the debug markers of every module and of the planner itself.
    pub fn visualize(&self, state: &State, data: &RealTimeData, sink: &mut dyn VisualsSink) {
        for module in self.modules.iter() {
            module.visualize(data, &self.module_data, sink);
        }

        sink.publish(
            "planned_trajectory",
            visuals::trajectory_markers(&self.output.trajectory, 0.2, 3),
        );
        sink.publish("obstacles", visuals::obstacle_markers(&data.dynamic_obstacles));
        sink.publish(
            "obstacle_predictions",
            visuals::prediction_markers(&data.dynamic_obstacles, self.draw_every),
        );
        sink.publish(
            "robot_area",
            visuals::robot_area_markers(state.pos(), state.get(state::PSI), &data.robot_area),
        );

        // Robot discs along the planned trajectory
        let mut discs = Vec::new();
        for (i, pos) in self.output.trajectory.positions.iter().enumerate() {
            let psi = self.get_solution(i + 1, state::PSI).unwrap_or(0.0);
            discs.extend(visuals::robot_area_markers(*pos, psi, &data.robot_area));
        }
        sink.publish("robot_area_trajectory", discs);
    }

    /// Reset the solver, the modules, the state and the real-time data.
    pub fn reset(&mut self, state: &mut State, data: &mut RealTimeData) {
        self.solver.reset();

        for module in self.modules.iter_mut() {
            module.reset();
        }

        self.output = PlannerOutput::new(self.solver.dt());
        self.module_data = ModuleData::new();

        state.reset();
        data.reset();
    }

    /// True if every module's objective is reached.
    pub fn is_objective_reached(&self, data: &RealTimeData) -> bool {
        self.modules.iter().all(|m| m.is_objective_reached(data))
    }

    /// Read the planned positions of stages 1 to N-1.
    fn extract_trajectory(&self, dt: f64, n: usize) -> Result<Trajectory, PlanFailure> {
        let mut trajectory = Trajectory::new(dt);

        for k in 1..n {
            let get = |name: &str| {
                self.solver
                    .get_output(k, name)
                    .ok_or_else(|| PlanFailure::MissingOutput {
                        stage: k,
                        name: name.to_string(),
                    })
            };

            trajectory.add(nalgebra::Vector2::new(get(state::X)?, get(state::Y)?));
        }

        Ok(trajectory)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{DynamicObstacle, ReferencePath};
    use crate::modules::ModuleKind;
    use crate::obstacles::ensure_obstacle_size;
    use crate::params::test::default_params;
    use crate::solver::RolloutSolver;
    use crate::visuals::RecordingVisuals;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Straight path of 4 points along x with the goal at its end.
    fn scenario(params: &PlannerParams) -> (Planner<RolloutSolver>, State, RealTimeData) {
        let planner = Planner::new(params, RolloutSolver::new(params)).unwrap();
        let state = State::new();

        let mut data = RealTimeData::new(
            params.robot.length,
            params.robot.width,
            params.robot.n_discs,
            params.past_trajectory_length,
        );
        data.path = ReferencePath::new(vec![0.0, 2.0, 4.0, 6.0], vec![0.0; 4]);
        data.goal = Vector2::new(6.0, 0.0);
        data.goal_received = true;

        (planner, state, data)
    }

    fn add_obstacles(params: &PlannerParams, state: &State, data: &mut RealTimeData) {
        ensure_obstacle_size(
            &mut data.dynamic_obstacles,
            state.pos(),
            params.max_obstacles,
            params.integrator_step,
            params.horizon,
        );
    }

    /// A module which replaces the solve.
    struct Shortcut(ExitCode);

    impl ControllerModule for Shortcut {
        fn name(&self) -> &str {
            "shortcut"
        }

        fn module_type(&self) -> ModuleType {
            ModuleType::Objective
        }

        fn is_data_ready(&self, _data: &RealTimeData, _missing_data: &mut String) -> bool {
            true
        }

        fn update(&mut self, _: &mut State, _: &RealTimeData, _: &mut ModuleData, _: &dyn Solver) {}

        fn set_parameters(&mut self, _: &mut dyn Solver, _: &RealTimeData, _: &ModuleData, _: usize) {}

        fn optimize(
            &mut self,
            _: &State,
            _: &RealTimeData,
            _: &ModuleData,
            _: &mut dyn Solver,
        ) -> Option<ExitCode> {
            Some(self.0)
        }
    }

    /// A module which fails the solve while its flag is set.
    struct Switch(Rc<Cell<bool>>);

    impl ControllerModule for Switch {
        fn name(&self) -> &str {
            "switch"
        }

        fn module_type(&self) -> ModuleType {
            ModuleType::Constraint
        }

        fn is_data_ready(&self, _data: &RealTimeData, _missing_data: &mut String) -> bool {
            true
        }

        fn update(&mut self, _: &mut State, _: &RealTimeData, _: &mut ModuleData, _: &dyn Solver) {}

        fn set_parameters(&mut self, _: &mut dyn Solver, _: &RealTimeData, _: &ModuleData, _: usize) {}

        fn optimize(
            &mut self,
            _: &State,
            _: &RealTimeData,
            _: &ModuleData,
            _: &mut dyn Solver,
        ) -> Option<ExitCode> {
            if self.0.get() {
                Some(ExitCode::INFEASIBLE)
            } else {
                None
            }
        }
    }

    #[test]
    fn test_straight_path() {
        let params = default_params();
        let (mut planner, mut state, mut data) = scenario(&params);
        planner.on_data_received(&data, "reference_path");

        // Obstacles are configured but none have been received
        let output = planner.solve_mpc(&mut state, &data);
        assert!(!output.success);
        assert_eq!(output.failure, Some(PlanFailure::MissingData("Obstacles".into())));
        assert!(output.trajectory.is_empty());

        add_obstacles(&params, &state, &mut data);
        let output = planner.solve_mpc(&mut state, &data);

        assert!(output.success, "{:?}", output.failure);
        assert_eq!(output.trajectory.len(), params.horizon - 1);

        let start_dist = (data.goal - state.pos()).norm();
        let end = output.trajectory.last().unwrap();
        assert!((data.goal - end).norm() < start_dist);

        assert_eq!(planner.output(), &output);
        assert!(planner.get_solution(1, "v").is_some());

        // Warm started second cycle
        let output = planner.solve_mpc(&mut state, &data);
        assert!(output.success);
    }

    #[test]
    fn test_constraints_skip_first_stage() {
        let params = default_params();
        let (mut planner, mut state, mut data) = scenario(&params);
        planner.on_data_received(&data, "reference_path");
        add_obstacles(&params, &state, &mut data);

        assert!(planner.solve_mpc(&mut state, &data).success);
        let solver = planner.solver();

        // Objectives are set on every stage
        assert!(solver.get_parameter(0, "acceleration").is_some());
        assert!(solver.get_parameter(0, "spline0_start").is_some());

        // Constraints are not set on the fixed initial stage
        for name in &["lin_constraint_0_a1", "lin_constraint_1_b", "gaussian_obst_0_x", "ego_disc_radius"] {
            assert_eq!(solver.get_parameter(0, name), None, "{}", name);
            assert!(solver.get_parameter(1, name).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_corridor_reaches_road_constraints() {
        let params = default_params();
        let (mut planner, mut state, mut data) = scenario(&params);
        planner.on_data_received(&data, "reference_path");
        add_obstacles(&params, &state, &mut data);

        assert!(planner.solve_mpc(&mut state, &data).success);
        let solver = planner.solver();

        // Path along +x, so the left bound is y <= w/2 - r and the right one
        // -y <= w/2 - r
        let bound = params.road.width / 2.0 - params.robot.width / 2.0;
        for k in 1..params.horizon {
            let get = |name: &str| solver.get_parameter(k, name).unwrap();

            assert_relative_eq!(get("lin_constraint_0_a1"), 0.0, epsilon = 1e-6);
            assert_relative_eq!(get("lin_constraint_0_a2"), 1.0, epsilon = 1e-6);
            assert_relative_eq!(get("lin_constraint_0_b"), bound, epsilon = 1e-6);
            assert_relative_eq!(get("lin_constraint_1_a2"), -1.0, epsilon = 1e-6);
            assert_relative_eq!(get("lin_constraint_1_b"), bound, epsilon = 1e-6);
        }
        assert!((bound - 1.0).abs() > 0.1);
    }

    #[test]
    fn test_missing_data_accumulates() {
        let params = default_params();
        let (mut planner, mut state, mut data) = scenario(&params);
        data.goal_received = false;
        data.path.clear();

        let output = planner.solve_mpc(&mut state, &data);
        assert_eq!(
            output.failure,
            Some(PlanFailure::MissingData("Reference Path Goal Obstacles".into()))
        );
    }

    #[test]
    fn test_goal_only() {
        let mut params = default_params();
        params.modules = vec![ModuleKind::MpcBase, ModuleKind::Goal];

        let (mut planner, mut state, data) = scenario(&params);
        let output = planner.solve_mpc(&mut state, &data);

        assert!(output.success);
        assert!(output.trajectory.last().unwrap().x > 0.0);
    }

    #[test]
    fn test_module_replaces_solve() {
        let params = default_params();
        let modules: Vec<Box<dyn ControllerModule>> = vec![
            Box::new(Shortcut(ExitCode::INFEASIBLE)),
            Box::new(Shortcut(ExitCode::SUCCESS)),
        ];
        let mut planner =
            Planner::with_modules(&params, RolloutSolver::new(&params), modules).unwrap();

        let mut state = State::new();
        let data = RealTimeData::new(0.65, 0.5, 1, 10);

        // The first module wins, the solver is never run
        let output = planner.solve_mpc(&mut state, &data);
        assert_eq!(output.failure, Some(PlanFailure::InfeasibleSolve(0)));
        assert!(output.trajectory.is_empty());
    }

    #[test]
    fn test_infeasible_discards_previous() {
        let mut params = default_params();
        params.modules = vec![ModuleKind::MpcBase, ModuleKind::Goal];

        let fail = Rc::new(Cell::new(false));
        let mut modules = build_modules(&params);
        modules.push(Box::new(Switch(fail.clone())));

        let (_, mut state, data) = scenario(&params);
        let mut planner =
            Planner::with_modules(&params, RolloutSolver::new(&params), modules).unwrap();

        assert!(planner.solve_mpc(&mut state, &data).success);

        fail.set(true);
        let output = planner.solve_mpc(&mut state, &data);
        assert_eq!(output.failure, Some(PlanFailure::InfeasibleSolve(0)));
        assert!(!planner.output().success);
        assert!(planner.output().trajectory.is_empty());

        // Recovers on the next cycle from the measured state
        fail.set(false);
        assert!(planner.solve_mpc(&mut state, &data).success);
    }

    #[test]
    fn test_reset() {
        let params = default_params();
        let (mut planner, mut state, mut data) = scenario(&params);
        planner.on_data_received(&data, "reference_path");
        data.dynamic_obstacles
            .push(DynamicObstacle::new(2, Vector2::new(1.0, 1.0), 0.0, 0.3));
        add_obstacles(&params, &state, &mut data);
        state.set(state::X, 1.0);

        let discs = data.robot_area.clone();
        planner.reset(&mut state, &mut data);

        assert!(!data.goal_received);
        assert!(data.dynamic_obstacles.is_empty());
        assert!(data.path.is_empty());
        assert_eq!(data.robot_area, discs);
        assert_eq!(state, State::default());
        assert!(!planner.is_objective_reached(&data));
    }

    #[test]
    fn test_visualize() {
        let params = default_params();
        let (mut planner, mut state, mut data) = scenario(&params);
        planner.on_data_received(&data, "reference_path");
        add_obstacles(&params, &state, &mut data);
        assert!(planner.solve_mpc(&mut state, &data).success);

        let mut visuals = RecordingVisuals::new();
        planner.visualize(&state, &data, &mut visuals);

        assert_eq!(visuals.get("planned_trajectory").len(), params.horizon - 2);
        assert_eq!(visuals.get("robot_area").len(), params.robot.n_discs);
        assert_eq!(
            visuals.get("robot_area_trajectory").len(),
            (params.horizon - 1) * params.robot.n_discs
        );
        // Only dummies, which are not drawn
        assert!(visuals.get("obstacles").is_empty());
        assert_eq!(visuals.get("goal/markers").len(), 1);
    }

    #[test]
    fn test_horizon_mismatch() {
        let params = default_params();
        let mut other = params.clone();
        other.horizon = 5;

        let result = Planner::new(&params, RolloutSolver::new(&other));
        assert!(matches!(result, Err(PlannerError::HorizonMismatch { .. })));
    }
}
