//! Main tiller pilot executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Sensor acquisition, each compass and GPS sample is run through
//!           the autopilot as it's read
//!         - Telecommand processing and handling
//!         - Grace delays and tuning timeouts
//!         - Motor demand delivery
//!         - Status logging on the 1Hz cycle
//!
//! # Modules
//!
//! All control stages (e.g. `rate_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use pilot_lib::{
    autopilot::Autopilot,
    data_store::DataStore,
    motor::{LogDriver, MotorDriver},
    params::PilotParams,
    sensors::{NullSource, ReplaySource, SensorSource, SourceProxy},
};

#[cfg(feature = "sim")]
use pilot_lib::sensors::SimBoat;

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.05;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tiller pilot command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "pilot_exec")]
struct Opt {
    /// Telecommand script to run, the pilot stops at the end of the script.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Start on the simulated boat rather than the real sensors.
    #[structopt(long)]
    sim: bool,

    /// Sensor log (CSV) to replay as the real sensors.
    #[structopt(long, parse(from_os_str))]
    replay: Option<PathBuf>,

    /// Parameter file, relative to the params directory.
    #[structopt(long, default_value = "pilot.toml")]
    params: String,

    /// Stop after this many seconds.
    #[structopt(long)]
    duration: Option<f64>,

    /// Write per-sample controller values to the session log.
    #[structopt(long)]
    trace: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    None,
    Script(ScriptInterpreter),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let opt = Opt::from_args();

    // Initialise session
    let session = Session::new("pilot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    let log_level = if opt.trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Tiller Pilot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let params: PilotParams =
        util::params::load(&opt.params).wrap_err("Could not load pilot params")?;

    info!("Pilot parameters loaded from \"{}\"", opt.params);

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        }
        None => {
            info!("No script provided, the pilot will hold its initial state\n");
            TcSource::None
        }
    };

    // ---- INITIALISE EQUIPMENT ----

    info!("Initialising equipment...");

    #[cfg(feature = "sim")]
    let (sim_source, sim_motor): (Box<dyn SensorSource>, Box<dyn MotorDriver>) = {
        params.sim.validate().wrap_err("Invalid simulation parameters")?;
        let boat = SimBoat::new(&params.sim);
        let tiller = boat.tiller();
        (Box::new(boat), Box::new(tiller))
    };

    #[cfg(not(feature = "sim"))]
    let (sim_source, sim_motor): (Box<dyn SensorSource>, Box<dyn MotorDriver>) = {
        if opt.sim {
            warn!("Built without the simulated boat, no sensors will be available");
        }
        (Box::new(NullSource), Box::new(LogDriver::default()))
    };

    let real_source: Box<dyn SensorSource> = match opt.replay {
        Some(ref path) => Box::new(
            ReplaySource::from_path(path).wrap_err("Failed to load the sensor log")?,
        ),
        None => Box::new(NullSource),
    };

    let sensors = SourceProxy::new(sim_source, real_source, opt.sim);
    info!("Sensor source: {}", sensors.active_name());

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let autopilot = Autopilot::new(params).wrap_err("Failed to initialise the Autopilot")?;
    info!("Autopilot init complete");

    let mut ds = DataStore::new(autopilot, sensors, sim_motor, Box::new(LogDriver::default()));

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        ds.cycle_start(CYCLE_FREQUENCY_HZ);
        let now_s = ds.sim_time_s;

        // ---- DATA INPUT AND CONTROL ----

        ds.process_sensors(now_s);

        // ---- TELECOMMAND PROCESSING ----

        match tc_source {
            TcSource::None => (),
            TcSource::Script(ref mut si) => match si.get_pending_tcs(now_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::exec(&mut ds, tc);
                    }
                }
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break;
                }
            },
        }

        // Apply anything the TCs made due straight away
        ds.autopilot.poll(now_s);

        // ---- MOTOR OUTPUT ----

        ds.send_motor(now_s);

        // ---- TELEMETRY ----

        ds.cycle_end();

        if ds.is_1_hz_cycle {
            ds.log_status();
        }

        if let Some(d) = opt.duration {
            if now_s >= d {
                info!("Run duration of {:.1} s reached, stopping", d);
                break;
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }
    }

    // ---- SHUTDOWN ----

    ds.stop_all();

    session
        .save_json("status.json", &ds.autopilot.status())
        .wrap_err("Failed to save the final status")?;

    if !ds.autopilot.saved_gains().is_empty() {
        session
            .save_json("saved_gains.json", &ds.autopilot.saved_gains())
            .wrap_err("Failed to save the tuned gains")?;
        info!(
            "{} saved gain sets written to the session",
            ds.autopilot.saved_gains().len()
        );
    }

    info!("End of execution");

    Ok(())
}
