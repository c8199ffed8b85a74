//! Unit-sphere geography.
//!
//! Conventions match the globe's scene space: +Y is the north pole and the
//! longitude origin is offset by 180° so that `(0, 0)` lands on `+X`.

use super::Vec3;

/// Mean Earth radius used for great-circle distances (kilometers).
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Converts latitude/longitude in degrees to a position on a sphere of `radius`.
///
/// `phi = (90 - lat)`, `theta = (lng + 180)` (both in radians), then
/// `x = -r sin(phi) cos(theta)`, `y = r cos(phi)`, `z = r sin(phi) sin(theta)`.
pub fn lat_lng_to_position(lat: f64, lng: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat) * (std::f64::consts::PI / 180.0);
    let theta = (lng + 180.0) * (std::f64::consts::PI / 180.0);

    Vec3::new(
        -(radius * phi.sin() * theta.cos()),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Inverse of [`lat_lng_to_position`]. Returns `(lat, lng)` in degrees with
/// longitude in `[-180, 180]`. The origin maps to `(0, 0)`.
pub fn position_to_lat_lng(position: Vec3) -> (f64, f64) {
    let r = position.length();
    if !r.is_finite() || r <= f64::EPSILON {
        return (0.0, 0.0);
    }

    let phi = (position.y / r).clamp(-1.0, 1.0).acos();
    let lat = 90.0 - phi.to_degrees();

    let theta = position.z.atan2(-position.x);
    let mut lng = theta.to_degrees() - 180.0;
    if lng < -180.0 {
        lng += 360.0;
    }

    (lat, lng)
}

pub fn validate_coordinates(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

/// Haversine distance between two `(lat, lng)` pairs in degrees.
pub fn great_circle_distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lng1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lng2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::{
        great_circle_distance_km, lat_lng_to_position, position_to_lat_lng, validate_coordinates,
    };

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_maps_to_positive_x() {
        let p = lat_lng_to_position(0.0, 0.0, 1.0);
        assert_close(p.x, 1.0, 1e-12);
        assert_close(p.y, 0.0, 1e-12);
        assert_close(p.z, 0.0, 1e-12);
    }

    #[test]
    fn north_pole_ignores_longitude() {
        for lng in [-180.0, -45.0, 0.0, 37.61, 180.0] {
            let p = lat_lng_to_position(90.0, lng, 2.0);
            assert_close(p.x, 0.0, 1e-12);
            assert_close(p.y, 2.0, 1e-12);
            assert_close(p.z, 0.0, 1e-12);
        }
    }

    #[test]
    fn radius_scales_linearly() {
        let unit = lat_lng_to_position(55.75, 37.61, 1.0);
        let far = lat_lng_to_position(55.75, 37.61, 2.0);
        assert_close(far.x, unit.x * 2.0, 1e-12);
        assert_close(far.y, unit.y * 2.0, 1e-12);
        assert_close(far.z, unit.z * 2.0, 1e-12);
        assert_close(unit.length(), 1.0, 1e-12);
    }

    #[test]
    fn small_input_deltas_give_small_output_deltas() {
        let a = lat_lng_to_position(10.0, 20.0, 1.0);
        let b = lat_lng_to_position(10.0 + 1e-6, 20.0 - 1e-6, 1.0);
        assert!((a - b).length() < 1e-7);
    }

    #[test]
    fn inverse_round_trips() {
        for (lat, lng) in [(55.75, 37.61), (-33.9, 151.2), (0.0, -90.0), (12.5, 179.0)] {
            let p = lat_lng_to_position(lat, lng, 1.7);
            let (lat_rt, lng_rt) = position_to_lat_lng(p);
            assert_close(lat_rt, lat, 1e-9);
            assert_close(lng_rt, lng, 1e-9);
        }
    }

    #[test]
    fn validates_ranges_inclusive() {
        assert!(validate_coordinates(90.0, 180.0));
        assert!(validate_coordinates(-90.0, -180.0));
        assert!(!validate_coordinates(90.1, 0.0));
        assert!(!validate_coordinates(0.0, -180.5));
        assert!(!validate_coordinates(f64::NAN, 0.0));
    }

    #[test]
    fn moscow_to_saint_petersburg_distance() {
        let d = great_circle_distance_km((55.7558, 37.6176), (59.9343, 30.3351));
        assert!((630.0..640.0).contains(&d), "distance {d}");
        assert_close(great_circle_distance_km((1.0, 2.0), (1.0, 2.0)), 0.0, 1e-9);
    }
}
