//! Heading and rotation rate control against the simulated boat

#![cfg(feature = "sim")]

mod common;

use approx::assert_abs_diff_eq;
use comms_if::tc::Stage;
use pilot_lib::nav::geo;

use common::Harness;

#[test]
fn test_holds_desired_heading() {
    let mut h = Harness::new();

    h.autopilot.set_desired_heading(90.0);
    h.autopilot.enable(Stage::Orientation).unwrap();
    h.run_for(120.0);

    // The compass reads 30 degrees clockwise of true
    let status = h.autopilot.status();
    assert_abs_diff_eq!(status.filtered_heading_deg.unwrap(), 90.0, epsilon = 2.0);
    assert_abs_diff_eq!(geo::normalize_delta(h.model().heading_deg - 60.0), 0.0, epsilon = 2.0);
    assert!(status.desired_rate_dps.abs() < 1.0);
}

#[test]
fn test_heading_change_through_north() {
    let mut h = Harness::new();

    h.autopilot.set_desired_heading(30.0);
    h.autopilot.enable(Stage::Orientation).unwrap();
    h.run_for(30.0);

    // Shortest way round is counterclockwise through north
    h.autopilot.set_desired_heading(330.0);
    h.step();
    h.step();
    h.step();
    assert!(h.autopilot.status().desired_rate_dps < 0.0);

    h.run_for(120.0);
    let heading = h.autopilot.status().filtered_heading_deg.unwrap();
    assert_abs_diff_eq!(geo::normalize_delta(heading - 330.0), 0.0, epsilon = 2.0);
}

#[test]
fn test_rate_limit_follows_speed() {
    let mut h = Harness::new();

    h.autopilot.enable(Stage::RotationRate).unwrap();
    h.step();
    assert_abs_diff_eq!(h.autopilot.status().max_rate_dps, 4.0);

    // 3 knots at 4 deg/s per knot once the GPS has measured the speed
    h.run_for(30.0);
    assert_abs_diff_eq!(h.autopilot.status().max_rate_dps, 12.0, epsilon = 0.5);

    h.autopilot.set_desired_rotation_rate(50.0);
    h.run_for(10.0);
    let status = h.autopilot.status();
    assert!(status.filtered_rate_dps.unwrap() > 0.0);
    assert!(h.model().tiller_deg < 0.0);
}

#[test]
fn test_disable_orientation_stops_turning() {
    let mut h = Harness::new();

    h.autopilot.set_desired_heading(200.0);
    h.autopilot.enable(Stage::Orientation).unwrap();
    h.run_for(5.0);
    assert!(h.autopilot.status().desired_rate_dps > 0.0);

    h.autopilot.disable(Stage::Orientation);
    h.run_for(60.0);

    let status = h.autopilot.status();
    assert!(status.rotation_rate_enabled);
    assert_eq!(status.desired_rate_dps, 0.0);
    assert!(status.filtered_rate_dps.unwrap().abs() < 0.5);
}

#[test]
fn test_disable_rate_neutral_motor() {
    let mut h = Harness::new();

    h.autopilot.enable(Stage::RotationRate).unwrap();
    h.autopilot.set_desired_rotation_rate(-5.0);
    h.run_for(1.0);
    assert!(h.autopilot.motor_output().power() != 0.0);

    h.autopilot.disable(Stage::RotationRate);
    h.run_for(0.5);
    assert_eq!(h.autopilot.motor_output().power(), 0.0);
    assert_eq!(h.model().power, 0.0);
}
