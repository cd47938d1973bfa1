//! Demo scenario description and simulation
//!
//! A scenario gives the robot's starting pose, the reference path, the goal
//! and a set of obstacles moving at constant velocity. The obstacles are
//! simulated in their own thread and published through the ingestion queue
//! the same way an external tracker would.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Vector2;
use serde::Deserialize;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use planner_lib::{
    data::{state, DynamicObstacle, ReferencePath},
    ingest::{DataEvent, DataSender},
    obstacles::gaussian_constant_velocity_prediction,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    /// Number of control cycles to run before stopping.
    pub num_cycles: u64,

    /// Period between two obstacle messages.
    ///
    /// Units: milliseconds
    pub obstacle_period_ms: u64,

    pub start: StartPose,

    pub goal: Point,

    pub path: PathSpec,

    #[serde(default)]
    pub obstacles: Vec<ObstacleSpec>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct StartPose {
    /// Units: meters
    pub x: f64,

    /// Units: meters
    pub y: f64,

    /// Units: radians
    pub psi: f64,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PathSpec {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ObstacleSpec {
    /// Initial position.
    ///
    /// Units: meters
    pub x: f64,
    pub y: f64,

    /// Constant velocity.
    ///
    /// Units: meters/second
    pub vx: f64,
    pub vy: f64,

    /// Units: meters
    pub radius: f64,

    /// Growth of the uncertainty ellipse radii per prediction step.
    ///
    /// Units: meters
    pub major_rate: f64,
    pub minor_rate: f64,
}

/// Kinematic state of the simulated robot.
#[derive(Debug, Clone, Copy)]
pub struct RobotSim {
    pub pos: Vector2<f64>,
    pub psi: f64,
    pub v: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scenario {
    pub fn reference_path(&self) -> ReferencePath {
        ReferencePath::new(self.path.x.clone(), self.path.y.clone())
    }

    pub fn goal(&self) -> Vector2<f64> {
        Vector2::new(self.goal.x, self.goal.y)
    }

    pub fn start(&self) -> RobotSim {
        RobotSim {
            pos: Vector2::new(self.start.x, self.start.y),
            psi: self.start.psi,
            v: 0.0,
        }
    }

    /// Send the episode's path and goal.
    pub fn publish_episode(&self, sender: &DataSender) -> bool {
        sender
            .send(DataEvent::ReferencePath(self.reference_path()))
            .and_then(|_| sender.send(DataEvent::Goal(self.goal())))
            .is_ok()
    }
}

impl RobotSim {
    /// Integrate the unicycle over `dt` with the given speed and turn rate.
    pub fn integrate(&mut self, v: f64, w: f64, dt: f64) {
        self.v = v;
        self.pos += Vector2::new(self.psi.cos(), self.psi.sin()) * v * dt;
        self.psi = util::maths::wrap_to_pi(self.psi + w * dt);
    }

    /// The state event describing this robot.
    pub fn to_event(&self) -> DataEvent {
        DataEvent::State(vec![
            (state::X.to_string(), self.pos.x),
            (state::Y.to_string(), self.pos.y),
            (state::PSI.to_string(), self.psi),
            (state::V.to_string(), self.v),
        ])
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Start the obstacle simulation thread.
///
/// The thread exits once the receiving side of the queue has been dropped.
pub fn spawn_obstacle_sim(
    obstacles: Vec<ObstacleSpec>,
    period: Duration,
    dt: f64,
    horizon: usize,
    sender: DataSender,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        let mut num_sent: u64 = 0;

        loop {
            let t = start.elapsed().as_secs_f64();

            let observed = obstacles
                .iter()
                .enumerate()
                .map(|(i, spec)| {
                    let velocity = Vector2::new(spec.vx, spec.vy);
                    let position = Vector2::new(spec.x, spec.y) + velocity * t;

                    let mut obstacle = DynamicObstacle::new(
                        i as i64,
                        position,
                        spec.vy.atan2(spec.vx),
                        spec.radius,
                    );
                    obstacle.prediction = gaussian_constant_velocity_prediction(
                        position,
                        velocity,
                        dt,
                        horizon,
                        spec.major_rate,
                        spec.minor_rate,
                    );
                    obstacle
                })
                .collect();

            if sender.send(DataEvent::Obstacles(observed)).is_err() {
                break;
            }
            num_sent += 1;

            thread::sleep(period);
        }

        debug!("Obstacle simulation sent {} messages", num_sent);
        info!("Obstacle simulation stopped");
    })
}
