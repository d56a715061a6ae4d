//! Manual steering helpers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;

use super::{Autopilot, AutopilotError};
use comms_if::tc::Stage;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Heading change per unit of manual level while orientation is held.
///
/// Units: degrees
const MANUAL_HEADING_STEP_DEG: f64 = 5.0;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Autopilot {
    /// Stop following the path and hold the current heading.
    pub fn maintain_current_heading(&mut self) -> Result<(), AutopilotError> {
        self.disable(Stage::Path);

        let heading_deg = self
            .orient
            .filtered_heading()
            .ok_or(AutopilotError::NoHeading)?;

        info!("Maintaining heading {:.1} deg", heading_deg);
        self.orient.set_desired(heading_deg);
        self.enable(Stage::Orientation)
    }

    /// Hold the current heading offset by `offset_deg`, positive clockwise.
    pub fn offset_current_heading(&mut self, offset_deg: f64) -> Result<(), AutopilotError> {
        self.maintain_current_heading()?;

        let desired_deg = self.orient.desired() + offset_deg;
        self.orient.set_desired(desired_deg);
        Ok(())
    }

    /// Nudge the boat, positive levels turn to port.
    ///
    /// While holding a heading the heading is moved, otherwise the level is
    /// added to the desired rotation rate.
    pub fn move_manually(&mut self, level: f64) -> Result<(), AutopilotError> {
        if self.orient.is_enabled() {
            let desired_deg = self.orient.desired() - level * MANUAL_HEADING_STEP_DEG;
            self.orient.set_desired(desired_deg);
        } else {
            self.enable(Stage::RotationRate)?;
            let desired_dps = self.rate.desired() + level;
            self.rate.set_desired(desired_dps);
        }

        Ok(())
    }

    /// Bring the boat out of every automatic mode.
    ///
    /// Rate control is left running on a zero setpoint the first time, so the
    /// boat stops turning. Stopping again once the rate is already zero
    /// disables it.
    pub fn stop_manually(&mut self) {
        self.disable(Stage::Path);
        self.cancel_autotune(Stage::Orientation);
        self.cancel_autotune(Stage::RotationRate);
        self.disable(Stage::Orientation);

        if self.rate.desired() == 0.0 {
            self.disable(Stage::RotationRate);
        }
        self.rate.set_desired(0.0);

        info!("Manual stop");
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{params::PilotParams, pid::PidGains};
    use approx::assert_abs_diff_eq;
    use comms_if::eqpt::{HeadingSample, LatLon};

    fn pilot() -> Autopilot {
        let mut params = PilotParams::default();
        params.orientation.gains = PidGains::new(0.5, 0.0, 0.0);
        params.rate.gains = PidGains::new(0.2, 0.0, 0.0);
        Autopilot::new(params).unwrap()
    }

    #[test]
    fn test_maintain_needs_heading() {
        let mut ap = pilot();
        assert!(matches!(
            ap.maintain_current_heading(),
            Err(AutopilotError::NoHeading)
        ));
        assert!(!ap.is_enabled(Stage::Orientation));
    }

    #[test]
    fn test_maintain_and_offset() {
        let mut ap = pilot();
        ap.set_waypoints(vec![LatLon::new(51.0, -1.0)]);
        ap.enable(Stage::Path).unwrap();
        ap.on_heading(HeadingSample::new(120.0, 0.0));

        ap.maintain_current_heading().unwrap();
        assert!(!ap.is_enabled(Stage::Path));
        assert!(ap.is_enabled(Stage::Orientation));
        assert_abs_diff_eq!(ap.status().desired_heading_deg, 120.0, epsilon = 1e-9);

        ap.offset_current_heading(-130.0).unwrap();
        assert_abs_diff_eq!(ap.status().desired_heading_deg, 350.0, epsilon = 1e-9);
    }

    #[test]
    fn test_move_manually() {
        let mut ap = pilot();

        // Without orientation the level goes to the rate setpoint
        ap.move_manually(2.0).unwrap();
        assert!(ap.is_enabled(Stage::RotationRate));
        assert_abs_diff_eq!(ap.status().desired_rate_dps, 2.0);
        ap.move_manually(-0.5).unwrap();
        assert_abs_diff_eq!(ap.status().desired_rate_dps, 1.5);

        ap.set_desired_heading(10.0);
        ap.enable(Stage::Orientation).unwrap();
        ap.move_manually(3.0).unwrap();
        assert_abs_diff_eq!(ap.status().desired_heading_deg, 355.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stop_twice_disables_rate() {
        let mut ap = pilot();
        ap.set_desired_heading(90.0);
        ap.enable(Stage::Orientation).unwrap();
        ap.on_heading(HeadingSample::new(80.0, 0.0));
        assert!(ap.status().desired_rate_dps != 0.0);

        ap.stop_manually();
        assert!(!ap.is_enabled(Stage::Orientation));
        assert!(ap.is_enabled(Stage::RotationRate));
        assert_eq!(ap.status().desired_rate_dps, 0.0);

        ap.stop_manually();
        assert!(!ap.is_enabled(Stage::RotationRate));
    }

    #[test]
    fn test_stop_cancels_tuning() {
        let mut ap = pilot();
        ap.start_autotune(Stage::RotationRate).unwrap();

        ap.stop_manually();
        assert!(!ap.is_tuning(Stage::RotationRate));
        assert!(!ap.is_enabled(Stage::RotationRate));
    }
}
