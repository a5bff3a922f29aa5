//! Main manoeuvre executable entry point.
//!
//! Runs a drive described in the simulation parameters against a simulated
//! vehicle.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise session, logging and parameters
//!     - Build and plan the manoeuvre sequence
//!     - Main loop:
//!         - Trajectory execution processing, stepping the active manoeuvre
//!         - Archiving
//!         - Vehicle simulation
//!     - Save the run summary

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};

// Internal
use mnvr_lib::{
    mnvr::{self, MnvrInputs},
    sim::{self, SimVehicle},
    traj_exec::{self, TrajExec},
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of the run, saved into the session directory at exit.
#[derive(Serialize)]
struct RunSummary {
    num_cycles: u64,
    num_cmds: u64,
    final_dist_m: f64,
    final_speed_ms: f64,
    sequence_finished: bool,
    stopped: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "mnvr_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Longitudinal Manoeuvre Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mnvr_params: mnvr::Params = util::params::load("mnvr.toml")
        .wrap_err("Could not load manoeuvre params")?;
    let traj_exec_params: traj_exec::Params = util::params::load("traj_exec.toml")
        .wrap_err("Could not load trajectory execution params")?;
    let sim_params: sim::Params = util::params::load("sim.toml")
        .wrap_err("Could not load simulation params")?;

    info!("Exec parameters loaded");

    if traj_exec_params.cycle_period_s <= 0.0 {
        return Err(eyre!(
            "Expected a positive cycle period, found {}", traj_exec_params.cycle_period_s
        ));
    }

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let vehicle = SimVehicle::new(&sim_params);

    let mut traj_exec = TrajExec::new(traj_exec_params, &vehicle, &vehicle);
    traj_exec.init_archives(&session)
        .map_err(|e| eyre!("Failed to initialise TrajExec archives: {}", e))?;

    info!("Module initialisation complete\n");

    // ---- LOAD SEQUENCE ----

    let seq = sim::build_sequence(&sim_params.drive, &mnvr_params)
        .wrap_err("Failed to build the manoeuvre sequence")?;
    traj_exec.begin_sequence(seq, vehicle.dist_from_route_start_m())
        .wrap_err("Failed to plan the manoeuvre sequence")?;

    // ---- MAIN LOOP ----

    let cycle_period_s = traj_exec.params().cycle_period_s;
    let max_num_cycles = traj_exec.params().max_num_cycles;
    let realtime = traj_exec.params().realtime;

    let mut num_cycles = 0;
    let mut sequence_finished = false;
    let mut stopped = false;

    info!("Beginning main loop\n");

    while num_cycles < max_num_cycles {

        let cycle_start = Instant::now();

        // ---- TRAJECTORY EXECUTION ----

        let report = traj_exec.proc()
            .wrap_err("Trajectory execution failed")?;

        if let Err(e) = traj_exec.write() {
            warn!("Could not archive TrajExec report: {}", e);
        }

        num_cycles += 1;

        if report.sequence_finished {
            sequence_finished = true;
            break;
        }

        if vehicle.is_stopped() {
            info!(
                "Vehicle stopped at {:.2} m inside manoeuvre {:?}",
                vehicle.dist_from_route_start_m(),
                report.mnvr_index
            );
            if traj_exec.finish_at_stop() {
                sequence_finished = true;
            }
            else {
                stopped = true;
            }
            break;
        }

        // ---- SIMULATION ----

        vehicle.step(cycle_period_s);

        // ---- CYCLE MANAGEMENT ----

        if realtime {
            let cycle_dur = Instant::now() - cycle_start;
            match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                )
            }
        }
    }

    if stopped {
        warn!("Vehicle stopped before the end of the sequence, aborting sequence");
        traj_exec.abort_sequence();
    }
    else if !sequence_finished {
        warn!("Maximum number of cycles ({}) reached, aborting sequence", max_num_cycles);
        traj_exec.abort_sequence();
    }

    // ---- SHUTDOWN ----

    let summary = RunSummary {
        num_cycles,
        num_cmds: vehicle.num_cmds(),
        final_dist_m: vehicle.dist_from_route_start_m(),
        final_speed_ms: vehicle.current_speed_ms(),
        sequence_finished,
        stopped,
    };

    info!(
        "Run complete: {} cycles, {} commands, ended at {:.2} m, {:.2} m/s",
        summary.num_cycles, summary.num_cmds, summary.final_dist_m, summary.final_speed_ms
    );

    session.save("summary.json", &summary)
        .wrap_err("Failed to save the run summary")?;

    info!("End of execution");

    Ok(())
}
