//! # Geodesy functions
//!
//! Great circle calculations on a spherical Earth. Angles are in degrees,
//! bearings are measured clockwise from true north.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use comms_if::eqpt::LatLon;
use util::maths::{wrap_180, wrap_360};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Mean radius of the Earth.
///
/// Units: meters
pub const EARTH_RADIUS_M: f64 = 6371e3;

/// Meters per second in one knot.
pub const MPS_PER_KNOT: f64 = 1852.0 / 3600.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Great circle (haversine) distance between two points in meters.
pub fn distance_between_points_m(a: &LatLon, b: &LatLon) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial great circle bearing going from `start` to `end`, in [0, 360).
pub fn calculate_bearing(start: &LatLon, end: &LatLon) -> f64 {
    wrap_360(bearing_rad(start, end).to_degrees())
}

/// The point `distance_m` away from `start` along the great circle leaving at
/// `bearing_deg`.
pub fn calculate_new_position(start: &LatLon, distance_m: f64, bearing_deg: f64) -> LatLon {
    let ang_dist = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat_1 = start.latitude.to_radians();
    let lon_1 = start.longitude.to_radians();

    let lat_2 = (lat_1.sin() * ang_dist.cos() + lat_1.cos() * ang_dist.sin() * bearing.cos()).asin();
    let lon_2 = lon_1
        + (bearing.sin() * ang_dist.sin() * lat_1.cos())
            .atan2(ang_dist.cos() - lat_1.sin() * lat_2.sin());

    LatLon::new(lat_2.to_degrees(), lon_2.to_degrees())
}

/// Signed perpendicular distance of `current` from the great circle passing
/// through `start` at `heading_deg`.
///
/// Points to the left of the line are positive, points to the right negative.
pub fn distance_from_line_m(start: &LatLon, heading_deg: f64, current: &LatLon) -> f64 {
    let bearing_diff = heading_deg.to_radians() - bearing_rad(start, current);

    distance_between_points_m(start, current) * bearing_diff.sin()
}

/// Map a heading into [0, 360).
pub fn normalize_heading(heading_deg: f64) -> f64 {
    wrap_360(heading_deg)
}

/// Map a heading difference into (-180, 180].
pub fn normalize_delta(delta_deg: f64) -> f64 {
    wrap_180(delta_deg)
}

/// Circular mean of a set of angles, in (-180, 180].
///
/// Returns `None` for an empty set.
pub fn circular_mean<'a, I>(angles_deg: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut count = 0usize;
    let sum = angles_deg
        .into_iter()
        .fold(Vector2::<f64>::zeros(), |acc, a| {
            count += 1;
            let rad = a.to_radians();
            acc + Vector2::new(rad.cos(), rad.sin())
        });

    if count == 0 {
        return None;
    }

    Some(wrap_180(sum[1].atan2(sum[0]).to_degrees()))
}

pub fn mps_to_knots(speed_mps: f64) -> f64 {
    speed_mps / MPS_PER_KNOT
}

pub fn knots_to_mps(speed_kts: f64) -> f64 {
    speed_kts * MPS_PER_KNOT
}

/// Initial bearing in radians, in (-pi, pi].
fn bearing_rad(start: &LatLon, end: &LatLon) -> f64 {
    let lat_1 = start.latitude.to_radians();
    let lat_2 = end.latitude.to_radians();
    let d_lon = (end.longitude - start.longitude).to_radians();

    let y = d_lon.sin() * lat_2.cos();
    let x = lat_1.cos() * lat_2.sin() - lat_1.sin() * lat_2.cos() * d_lon.cos();

    y.atan2(x)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn rome() -> LatLon {
        LatLon::new(41.890074, 12.492374)
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_between_points_m(&rome(), &rome()), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(1.0, 0.0);
        assert_relative_eq!(
            distance_between_points_m(&a, &b),
            EARTH_RADIUS_M * 1f64.to_radians(),
            max_relative = 1e-9
        );
        assert_abs_diff_eq!(calculate_bearing(&a, &b), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(calculate_bearing(&b, &a), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_new_position_round_trip() {
        for &(dist_m, bearing) in [(50.0, 0.0), (1000.0, 45.0), (2500.0, 200.0), (10.0, 359.0)].iter() {
            let end = calculate_new_position(&rome(), dist_m, bearing);

            assert_relative_eq!(
                distance_between_points_m(&rome(), &end),
                dist_m,
                max_relative = 1e-5
            );
            assert_abs_diff_eq!(
                wrap_180(calculate_bearing(&rome(), &end) - bearing),
                0.0,
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn test_bearing_scale_invariant() {
        let start = rome();
        let near = LatLon::new(start.latitude + 1e-5, start.longitude + 2e-5);
        let far = LatLon::new(start.latitude + 4e-5, start.longitude + 8e-5);

        assert_abs_diff_eq!(
            calculate_bearing(&start, &near),
            calculate_bearing(&start, &far),
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_distance_from_line() {
        let start = rome();

        let right = calculate_new_position(&start, 100.0, 90.0);
        assert_abs_diff_eq!(distance_from_line_m(&start, 0.0, &right), -100.0, epsilon = 0.01);

        let left = calculate_new_position(&start, 100.0, 270.0);
        assert_abs_diff_eq!(distance_from_line_m(&start, 0.0, &left), 100.0, epsilon = 0.01);

        let ahead = calculate_new_position(&start, 100.0, 0.0);
        assert_abs_diff_eq!(distance_from_line_m(&start, 0.0, &ahead), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_circular_mean() {
        assert_eq!(circular_mean(&Vec::<f64>::new()), None);
        assert_abs_diff_eq!(circular_mean(&[350.0, 10.0]).unwrap(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            wrap_180(circular_mean(&[170.0, -170.0]).unwrap() - 180.0),
            0.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(circular_mean(&[10.0, 20.0, 30.0]).unwrap(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalisation_and_units() {
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_delta(270.0), -90.0);
        assert_relative_eq!(mps_to_knots(knots_to_mps(3.0)), 3.0);
        assert_relative_eq!(knots_to_mps(1.0), 0.514444, max_relative = 1e-5);
    }
}
