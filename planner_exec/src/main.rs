//! Planner demo executable entry point.
//!
//! # Architecture
//!
//! Runs the planner against a simulated robot and simulated obstacles:
//!
//!     - Initialise the session, logger, parameters and planner
//!     - Start the obstacle simulation thread
//!     - Main loop:
//!         - Apply data received since the last cycle
//!         - Restart the episode if the objective has been reached
//!         - Solve the MPC
//!         - Command the robot, or brake if the cycle failed
//!         - Publish the new robot state
//!         - Visualisation and archiving
//!
//! The scenario file (relative to the params directory) may be given as the
//! only argument, otherwise `scenario_straight.toml` is used.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod scenario;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, info, warn};
use serde::Serialize;
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use planner_lib::{
    data::{state, RealTimeData, State},
    ingest,
    solver::RolloutSolver,
    visuals::LogVisuals,
    Planner, PlannerParams,
};
use scenario::{spawn_obstacle_sim, Scenario};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const DEFAULT_SCENARIO: &str = "scenario_straight.toml";

/// Publish visualisation markers every this many cycles.
const VISUALISE_EVERY_CYCLES: u64 = 5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One row of the cycle archive.
#[derive(Serialize)]
struct CycleRecord {
    cycle: u64,
    time_s: f64,
    x_m: f64,
    y_m: f64,
    psi_rad: f64,
    v_ms: f64,
    spline_m: f64,
    success: bool,
    failure: String,
    cmd_v_ms: f64,
    cmd_w_rads: f64,
    solve_time_ms: f64,
}

/// Saved at the end of the run.
#[derive(Serialize)]
struct RunSummary {
    scenario: String,
    num_cycles: u64,
    num_failed_cycles: u64,
    num_episodes_completed: u64,
    mean_solve_time_ms: f64,
    max_solve_time_ms: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("planner_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("MPC Planner Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let scenario_path = match args.len() {
        1 => DEFAULT_SCENARIO.to_string(),
        2 => args[1].clone(),
        n => return Err(eyre!("Expected either zero or one argument, found {}", n - 1)),
    };

    let params: PlannerParams = util::params::load("planner.toml")
        .wrap_err("Could not load planner params")?;
    let scenario: Scenario = util::params::load(&scenario_path)
        .wrap_err_with(|| format!("Could not load scenario {}", scenario_path))?;

    info!("Parameters loaded, running scenario \"{}\"", scenario_path);

    // ---- INITIALISE PLANNER ----

    let solver = RolloutSolver::new(&params);
    let mut planner = Planner::new(&params, solver)
        .wrap_err("Failed to initialise the planner")?;

    let mut state = State::new();
    let mut data = RealTimeData::new(
        params.robot.length,
        params.robot.width,
        params.robot.n_discs,
        params.past_trajectory_length,
    );
    let (sender, mut inbox) = ingest::channel(&params);

    let mut archiver = Archiver::from_path(&session, "planner_cycles.csv")
        .wrap_err("Failed to create the cycle archive")?;
    let mut visuals = LogVisuals;

    // ---- START SIMULATION ----

    let mut robot = scenario.start();
    sender.send(robot.to_event()).wrap_err("Could not send the start state")?;
    if !scenario.publish_episode(&sender) {
        return Err(eyre!("Could not send the scenario path and goal"));
    }

    let obstacle_thread = spawn_obstacle_sim(
        scenario.obstacles.clone(),
        Duration::from_millis(scenario.obstacle_period_ms),
        params.integrator_step,
        params.horizon,
        sender.clone(),
    );

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(params.control_period_s());
    let mut summary = RunSummary {
        scenario: scenario_path.clone(),
        num_cycles: 0,
        num_failed_cycles: 0,
        num_episodes_completed: 0,
        mean_solve_time_ms: 0.0,
        max_solve_time_ms: 0.0,
    };
    let mut total_solve_time_ms = 0.0;

    for cycle in 0..scenario.num_cycles {
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        inbox.apply_pending(&mut state, &mut data, &mut planner);

        // ---- EPISODE MANAGEMENT ----

        if data.goal_received && planner.is_objective_reached(&data) {
            info!("Objective reached after {} cycles, restarting", cycle);
            summary.num_episodes_completed += 1;

            planner.reset(&mut state, &mut data);
            robot = scenario.start();

            sender.send(robot.to_event()).wrap_err("Could not send the start state")?;
            if !scenario.publish_episode(&sender) {
                return Err(eyre!("Could not send the scenario path and goal"));
            }
            inbox.apply_pending(&mut state, &mut data, &mut planner);
        }

        // ---- PLANNING ----

        let solve_start = Instant::now();
        let output = planner.solve_mpc(&mut state, &data);
        let solve_time_ms = solve_start.elapsed().as_secs_f64() * 1000.0;

        total_solve_time_ms += solve_time_ms;
        if solve_time_ms > summary.max_solve_time_ms {
            summary.max_solve_time_ms = solve_time_ms;
        }

        // ---- COMMAND ----

        let (cmd_v, cmd_w) = if output.success {
            (
                planner.get_solution(1, state::V).unwrap_or(0.0),
                planner.get_solution(0, "w").unwrap_or(0.0),
            )
        } else {
            summary.num_failed_cycles += 1;

            // Brake to a stop
            let v = (robot.v - params.deceleration_at_infeasible * params.control_period_s()).max(0.0);
            (v, 0.0)
        };

        robot.integrate(cmd_v, cmd_w, params.control_period_s());
        if sender.send(robot.to_event()).is_err() {
            warn!("Could not publish the robot state");
        }

        // ---- VISUALISATION ----

        if cycle % VISUALISE_EVERY_CYCLES == 0 {
            planner.visualize(&state, &data, &mut visuals);
        }

        // ---- WRITE ARCHIVES ----

        let record = CycleRecord {
            cycle,
            time_s: util::session::get_elapsed_seconds(),
            x_m: state.get(state::X),
            y_m: state.get(state::Y),
            psi_rad: state.get(state::PSI),
            v_ms: state.get(state::V),
            spline_m: state.get(state::SPLINE),
            success: output.success,
            failure: output.failure.map(|f| f.to_string()).unwrap_or_default(),
            cmd_v_ms: cmd_v,
            cmd_w_rads: cmd_w,
            solve_time_ms,
        };
        if let Err(e) = archiver.serialise(record) {
            warn!("Could not archive cycle {}: {}", cycle, e);
        }

        summary.num_cycles += 1;

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    }

    // ---- SHUTDOWN ----

    if summary.num_cycles > 0 {
        summary.mean_solve_time_ms = total_solve_time_ms / summary.num_cycles as f64;
    }
    info!(
        "Ran {} cycles, {} failed, {} episodes completed",
        summary.num_cycles, summary.num_failed_cycles, summary.num_episodes_completed
    );

    // Dropping the inbox stops the obstacle simulation
    drop(inbox);
    if obstacle_thread.join().is_err() {
        warn!("Obstacle simulation thread panicked");
    }

    session.save("run_summary.json", summary);
    session.exit();

    info!("End of execution");

    Ok(())
}
