//! # Data ingestion
//!
//! External data (state estimates, goals, paths and obstacles) may arrive on
//! any thread at any time. It is queued through a [`DataSender`] and only
//! applied to the planner's state and real-time data when the control loop
//! calls [`DataInbox::apply_pending`] at the start of a cycle, so a cycle never
//! sees data change underneath it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, trace};
use nalgebra::Vector2;
use thiserror::Error;

use crate::data::{DynamicObstacle, RealTimeData, ReferencePath, State};
use crate::obstacles::{ensure_obstacle_size, propagate_obstacles_uncertainty};
use crate::params::PlannerParams;
use crate::planner::Planner;
use crate::solver::Solver;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sending half of the ingestion queue.
#[derive(Debug, Clone)]
pub struct DataSender {
    sender: Sender<DataEvent>,
}

/// Receiving half of the ingestion queue, owned by the control loop.
pub struct DataInbox {
    receiver: Receiver<DataEvent>,
    max_obstacles: usize,
    dt: f64,
    horizon: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A piece of external data.
#[derive(Debug, Clone)]
pub enum DataEvent {
    /// New values for some state fields.
    State(Vec<(String, f64)>),

    Goal(Vector2<f64>),

    ReferencePath(ReferencePath),

    /// The full set of currently observed obstacles, not yet normalised.
    Obstacles(Vec<DynamicObstacle>),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("The data inbox has been dropped")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DataSender {
    pub fn send(&self, event: DataEvent) -> Result<(), IngestError> {
        self.sender.send(event).map_err(|_| IngestError::Disconnected)
    }
}

impl DataInbox {
    /// Apply every queued event in arrival order.
    ///
    /// Returns the number of events applied.
    pub fn apply_pending<S: Solver>(
        &mut self,
        state: &mut State,
        data: &mut RealTimeData,
        planner: &mut Planner<S>,
    ) -> usize {
        let mut count = 0;

        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event, state, data, planner);
            count += 1;
        }

        if count > 0 {
            trace!("Applied {} data events", count);
        }

        count
    }

    fn apply<S: Solver>(
        &self,
        event: DataEvent,
        state: &mut State,
        data: &mut RealTimeData,
        planner: &mut Planner<S>,
    ) {
        match event {
            DataEvent::State(values) => {
                for (name, value) in values.iter() {
                    state.set(name, *value);
                }
                data.past_trajectory.add(state.pos());
            }
            DataEvent::Goal(goal) => {
                data.goal = goal;
                data.goal_received = true;
                planner.on_data_received(data, "goal");
            }
            DataEvent::ReferencePath(path) => {
                if data.path.is_same_as(&path) {
                    debug!("Ignoring reference path identical to the current one");
                    return;
                }

                data.path = path;
                planner.on_data_received(data, "reference_path");
            }
            DataEvent::Obstacles(mut obstacles) => {
                ensure_obstacle_size(
                    &mut obstacles,
                    state.pos(),
                    self.max_obstacles,
                    self.dt,
                    self.horizon,
                );
                propagate_obstacles_uncertainty(&mut obstacles, self.dt, self.horizon);

                data.dynamic_obstacles = obstacles;
                planner.on_data_received(data, "dynamic obstacles");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Create a new ingestion queue.
pub fn channel(params: &PlannerParams) -> (DataSender, DataInbox) {
    let (sender, receiver) = mpsc::channel();

    (
        DataSender { sender },
        DataInbox {
            receiver,
            max_obstacles: params.max_obstacles,
            dt: params.integrator_step,
            horizon: params.horizon,
        },
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{state, PlanFailure, PredictionType};
    use crate::obstacles::gaussian_constant_velocity_prediction;
    use crate::params::test::default_params;
    use crate::solver::RolloutSolver;
    use approx::assert_relative_eq;

    #[test]
    fn test_apply_pending() {
        let params = default_params();
        let (sender, mut inbox) = channel(&params);
        let mut planner = Planner::new(&params, RolloutSolver::new(&params)).unwrap();
        let mut state = State::new();
        let mut data = RealTimeData::new(0.65, 0.5, 3, params.past_trajectory_length);

        // Sent from another thread
        let remote = sender.clone();
        std::thread::spawn(move || {
            remote
                .send(DataEvent::State(vec![
                    (state::X.to_string(), 1.0),
                    (state::Y.to_string(), 2.0),
                ]))
                .unwrap();
        })
        .join()
        .unwrap();

        let mut obstacle = DynamicObstacle::new(0, Vector2::new(4.0, 2.0), 0.0, 0.3);
        obstacle.prediction = gaussian_constant_velocity_prediction(
            obstacle.position,
            Vector2::zeros(),
            params.integrator_step,
            params.horizon,
            1.0,
            1.0,
        );
        sender.send(DataEvent::Obstacles(vec![obstacle])).unwrap();
        sender
            .send(DataEvent::ReferencePath(ReferencePath::new(
                vec![1.0, 2.0, 3.0],
                vec![2.0, 2.0, 2.0],
            )))
            .unwrap();
        sender.send(DataEvent::Goal(Vector2::new(3.0, 2.0))).unwrap();

        // Nothing changes until the queue is applied
        assert!(data.dynamic_obstacles.is_empty());

        assert_eq!(inbox.apply_pending(&mut state, &mut data, &mut planner), 4);
        assert_eq!(state.pos(), Vector2::new(1.0, 2.0));
        assert_eq!(data.past_trajectory.len(), 1);
        assert!(data.goal_received);
        assert_eq!(data.path.len(), 3);

        // Normalised around the robot and propagated once
        assert_eq!(data.dynamic_obstacles.len(), params.max_obstacles);
        assert_eq!(data.dynamic_obstacles[1].position, Vector2::new(101.0, 102.0));
        let pred = &data.dynamic_obstacles[0].prediction;
        assert_eq!(pred.kind, PredictionType::Gaussian);
        assert_relative_eq!(pred.steps[0].major_radius, params.integrator_step);
        assert_relative_eq!(
            pred.steps[3].major_radius,
            params.integrator_step * 2.0,
            epsilon = 1e-12
        );

        assert_eq!(inbox.apply_pending(&mut state, &mut data, &mut planner), 0);
    }

    #[test]
    fn test_same_path_ignored() {
        let params = default_params();
        let (sender, mut inbox) = channel(&params);
        let mut planner = Planner::new(&params, RolloutSolver::new(&params)).unwrap();
        let mut state = State::new();
        let mut data = RealTimeData::new(0.65, 0.5, 1, 10);

        let path = ReferencePath::new(vec![0.0, 1.0, 2.0], vec![0.0, 0.0, 0.0]);
        sender.send(DataEvent::ReferencePath(path.clone())).unwrap();
        inbox.apply_pending(&mut state, &mut data, &mut planner);

        // Resending with a different tail is treated as the same path
        let mut resent = path;
        resent.y[2] = 5.0;
        sender.send(DataEvent::ReferencePath(resent)).unwrap();
        inbox.apply_pending(&mut state, &mut data, &mut planner);

        assert_eq!(data.path.y[2], 0.0);
    }

    #[test]
    fn test_malformed_path_recoverable() {
        let params = default_params();
        let (sender, mut inbox) = channel(&params);
        let mut planner = Planner::new(&params, RolloutSolver::new(&params)).unwrap();
        let mut state = State::new();
        let mut data = RealTimeData::new(0.65, 0.5, 1, 10);

        let path = ReferencePath::new(vec![0.0, 1.0, 2.0], vec![0.0, 0.0, 0.0]);
        sender.send(DataEvent::ReferencePath(path.clone())).unwrap();
        inbox.apply_pending(&mut state, &mut data, &mut planner);

        // Fewer y than x values
        sender
            .send(DataEvent::ReferencePath(ReferencePath::new(
                vec![0.0, 1.0, 2.0],
                vec![0.0],
            )))
            .unwrap();
        assert_eq!(inbox.apply_pending(&mut state, &mut data, &mut planner), 1);
        assert_eq!(data.path.y.len(), 1);

        // No spline can be fitted, so the cycle reports the missing spline
        let output = planner.solve_mpc(&mut state, &data);
        match output.failure {
            Some(PlanFailure::MissingData(missing)) => {
                assert!(missing.contains("Reference Spline"), "{}", missing)
            }
            f => panic!("Expected missing data, got {:?}", f),
        }

        // A valid path afterwards is fitted again
        sender.send(DataEvent::ReferencePath(path)).unwrap();
        inbox.apply_pending(&mut state, &mut data, &mut planner);
        let contouring = planner
            .modules()
            .iter()
            .find(|m| m.name() == "contouring")
            .unwrap();
        let mut missing = String::new();
        assert!(contouring.is_data_ready(&data, &mut missing));
    }
}
