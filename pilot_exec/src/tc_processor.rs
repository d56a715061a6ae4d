//! # Telecommand processor module
//!
//! The telecommand processor handles TCs coming from any source. A TC which
//! can't be executed is logged and dropped, it never stops the pilot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use comms_if::tc::Tc;
use pilot_lib::{data_store::DataStore, params::PilotParams};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc) {
    debug!("Executing TC {:?}", tc);

    let result = match tc {
        Tc::SetWaypoints(wps) => {
            info!("{} waypoints received", wps.len());
            ds.autopilot.set_waypoints(wps.clone());
            Ok(())
        }
        Tc::SetDesiredHeading(h) => {
            ds.autopilot.set_desired_heading(*h);
            Ok(())
        }
        Tc::SetDesiredRotationRate(r) => {
            ds.autopilot.set_desired_rotation_rate(*r);
            Ok(())
        }
        Tc::Enable(stage) => ds.autopilot.enable(*stage),
        Tc::Disable(stage) => {
            ds.autopilot.disable(*stage);
            Ok(())
        }
        Tc::StartAutotune(stage) => ds.autopilot.start_autotune(*stage),
        Tc::CancelAutotune(stage) => {
            ds.autopilot.cancel_autotune(*stage);
            Ok(())
        }
        Tc::MaintainHeading => ds.autopilot.maintain_current_heading(),
        Tc::OffsetHeading(off) => ds.autopilot.offset_current_heading(*off),
        Tc::ManualMove(level) => ds.autopilot.move_manually(*level),
        Tc::ManualStop => {
            ds.autopilot.stop_manually();
            Ok(())
        }
        Tc::SetParams(value) => match PilotParams::from_json(value.clone()) {
            Ok(p) => ds.set_params(p),
            Err(e) => Err(e.into()),
        },
        Tc::SetSimulation(sim) => {
            ds.set_simulation(*sim);
            Ok(())
        }
        Tc::ApplySavedGains(title) => ds.autopilot.apply_saved_gains(title),
    };

    if let Err(e) = result {
        warn!("Could not execute {:?}: {}", tc, e);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
