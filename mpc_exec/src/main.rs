//! Main MPC executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and all modules
//!     - Main loop, once per control cycle:
//!         - Vehicle state acquisition from the simulation harness
//!         - MPC control processing
//!         - Actuation of the commanded demands (or the fallback if the
//!           solve failed)
//!     - Save the driven trajectory and final telemetry to the session
//!
//! The simulation harness stands in for the driving simulator link; swapping
//! it for a real telemetry transport does not touch the controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};

// Internal
use mpc_lib::mpc::{InputData, MpcCtrl, MpcError, RefPoly};
use mpc_lib::sim;
use util::{
    logger::{logger_init, LevelFilter},
    maths::{lin_map, norm},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Acceleration demand applied when a cycle's solve fails.
const FALLBACK_BRAKE_DEMAND: f64 = -0.5;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "mpc_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("MPC Driving Controller Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let sim_params: sim::Params = util::params::load(
        "sim.toml"
    ).wrap_err("Could not load sim params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let mut mpc = MpcCtrl::default();
    mpc.init("mpc.toml", &session)
        .wrap_err("Failed to initialise MpcCtrl")?;

    let poly = RefPoly::new(sim_params.path_coeffs);
    let mut sim = sim::Sim::new(&sim_params, mpc.params());

    info!(
        "MpcCtrl initialised: {} step horizon at {} s per step",
        mpc.params().n_steps,
        mpc.params().step_duration_s
    );

    // ---- MAIN LOOP ----

    info!("Running {} control cycles\n", sim_params.num_cycles);

    let mut driven_path: Vec<[f64; 2]> = Vec::with_capacity(sim_params.num_cycles);
    let mut last_output = None;
    let mut num_failures = 0usize;

    for cycle in 0..sim_params.num_cycles {
        let state = sim.vehicle_state();
        driven_path.push([state.x_m, state.y_m]);

        match mpc.proc(&InputData { state, coeffs: poly }) {
            Ok((output, report)) => {
                debug!(
                    "Cycle {:3}: cte {:+.3} m, speed {:5.1} m/s, steer {:+.3} rad \
                     ({:+.2} norm), accel {:+.2}, {} outer its, {:.1} ms",
                    cycle,
                    state.cte_m,
                    state.speed_ms,
                    output.steer_rad,
                    lin_map(
                        (-mpc.params().steer_bound_rad, mpc.params().steer_bound_rad),
                        (-1f64, 1f64),
                        output.steer_rad
                    ),
                    output.accel_norm,
                    report.outer_iterations,
                    report.solve_time_s * 1e3
                );

                sim.step(output.steer_rad, output.accel_norm);
                last_output = Some(output);
            }
            Err(e @ MpcError::ConvergenceFailure(_))
            | Err(e @ MpcError::NumericAnomaly(_)) => {
                // The controller refuses to emit a demand from a failed
                // solve; the fallback policy here is to brake gently with
                // the wheel held straight
                warn!("Cycle {:3}: {}, braking", cycle, e);
                num_failures += 1;

                sim.step(0f64, FALLBACK_BRAKE_DEMAND);
            }
            Err(e) => {
                return Err(e).wrap_err("MpcCtrl processing failed");
            }
        }
    }

    // ---- SHUTDOWN ----

    let final_state = sim.vehicle_state();
    let distance_m = match driven_path.first() {
        Some(start) => norm(start, &[final_state.x_m, final_state.y_m]).unwrap_or(0f64),
        None => 0f64,
    };

    info!(
        "\nRun complete: {} cycles, {} failed solves, {:.1} m start to finish, \
         final cte {:+.3} m",
        sim_params.num_cycles,
        num_failures,
        distance_m,
        final_state.cte_m
    );

    // Save the trajectory data for offline inspection
    session.save("driven_path.json", driven_path);
    if let Some(output) = last_output {
        session.save("final_demands.json", output.to_vec());
    }

    Ok(())
}
