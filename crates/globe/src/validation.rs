use foundation::math::validate_coordinates;
use scene::point_cloud::ParticipantPoint;

use crate::error::GlobeError;

pub const NAME_LEN: std::ops::RangeInclusive<usize> = 2..=100;
pub const ADDRESS_LEN: std::ops::RangeInclusive<usize> = 3..=200;

pub fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), GlobeError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(GlobeError::validation(
            "latitude",
            format!("{latitude} is outside [-90, 90]"),
        ));
    }
    if !validate_coordinates(latitude, longitude) {
        return Err(GlobeError::validation(
            "longitude",
            format!("{longitude} is outside [-180, 180]"),
        ));
    }
    Ok(())
}

pub fn check_point(point: &ParticipantPoint) -> Result<(), GlobeError> {
    if point.id.trim().is_empty() {
        return Err(GlobeError::validation("id", "must not be empty"));
    }
    check_coordinates(point.latitude, point.longitude)
}

/// Checks a whole batch before anything is applied.
pub fn check_points(points: &[ParticipantPoint]) -> Result<(), GlobeError> {
    points.iter().try_for_each(check_point)
}

/// Lightweight checks for a self-registration form.
pub fn check_registration(name: &str, address: &str) -> Result<(), GlobeError> {
    let name_len = name.trim().chars().count();
    if !NAME_LEN.contains(&name_len) {
        return Err(GlobeError::validation(
            "name",
            format!(
                "must be {}-{} characters",
                NAME_LEN.start(),
                NAME_LEN.end()
            ),
        ));
    }
    let address_len = address.trim().chars().count();
    if !ADDRESS_LEN.contains(&address_len) {
        return Err(GlobeError::validation(
            "address",
            format!(
                "must be {}-{} characters",
                ADDRESS_LEN.start(),
                ADDRESS_LEN.end()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_name_the_bad_axis() {
        assert!(check_coordinates(55.75, 37.61).is_ok());
        assert!(matches!(
            check_coordinates(91.0, 0.0),
            Err(GlobeError::Validation { field, .. }) if field == "latitude"
        ));
        assert!(matches!(
            check_coordinates(0.0, f64::INFINITY),
            Err(GlobeError::Validation { field, .. }) if field == "longitude"
        ));
    }

    #[test]
    fn batch_fails_on_any_bad_point() {
        let good = ParticipantPoint::new("a", "Alice", 1.0, 2.0);
        let blank = ParticipantPoint::new(" ", "Nobody", 1.0, 2.0);
        assert!(check_points(&[good.clone()]).is_ok());
        assert!(check_points(&[good, blank]).is_err());
        assert!(check_points(&[]).is_ok());
    }

    #[test]
    fn registration_lengths() {
        assert!(check_registration("Alice", "Moscow").is_ok());
        assert!(check_registration("A", "Moscow").is_err());
        assert!(check_registration("Alice", "  ").is_err());
        assert!(check_registration(&"x".repeat(101), "Moscow").is_err());
    }
}
