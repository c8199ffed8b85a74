//! Address to coordinate lookup.

use foundation::math::{great_circle_distance_km, validate_coordinates};
use serde::{Deserialize, Serialize};

use crate::backend::BoxFuture;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedAddress {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeError {
    NotFound(String),
    InvalidCoordinates { latitude: f64, longitude: f64 },
    Provider(String),
}

impl std::fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeocodeError::NotFound(query) => write!(f, "no match for '{query}'"),
            GeocodeError::InvalidCoordinates {
                latitude,
                longitude,
            } => write!(f, "invalid coordinates ({latitude}, {longitude})"),
            GeocodeError::Provider(msg) => write!(f, "geocoding provider error: {msg}"),
        }
    }
}

impl std::error::Error for GeocodeError {}

pub trait Geocoder: Send + Sync {
    fn geocode<'a>(&'a self, address: &'a str)
    -> BoxFuture<'a, Result<GeocodedAddress, GeocodeError>>;

    fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> BoxFuture<'_, Result<GeocodedAddress, GeocodeError>>;
}

/// Table-backed geocoder for hosts without network access.
///
/// Lookups ignore case and surrounding whitespace. Reverse lookups return the
/// nearest entry within `reverse_radius_km`.
#[derive(Debug, Clone)]
pub struct StaticGeocoder {
    entries: Vec<GeocodedAddress>,
    reverse_radius_km: f64,
}

impl Default for StaticGeocoder {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            reverse_radius_km: 50.0,
        }
    }
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        self.entries.push(GeocodedAddress {
            latitude,
            longitude,
            formatted_address: address.into(),
        });
        self
    }

    pub fn with_reverse_radius_km(mut self, radius_km: f64) -> Self {
        self.reverse_radius_km = radius_km;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        let wanted = address.trim();
        self.entries
            .iter()
            .find(|e| e.formatted_address.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| GeocodeError::NotFound(wanted.to_string()))
    }

    fn nearest(&self, latitude: f64, longitude: f64) -> Result<GeocodedAddress, GeocodeError> {
        if !validate_coordinates(latitude, longitude) {
            return Err(GeocodeError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        self.entries
            .iter()
            .map(|e| {
                let d = great_circle_distance_km((latitude, longitude), (e.latitude, e.longitude));
                (d, e)
            })
            .filter(|(d, _)| *d <= self.reverse_radius_km)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, e)| e.clone())
            .ok_or_else(|| GeocodeError::NotFound(format!("{latitude}, {longitude}")))
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<GeocodedAddress, GeocodeError>> {
        Box::pin(async move { self.lookup(address) })
    }

    fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> BoxFuture<'_, Result<GeocodedAddress, GeocodeError>> {
        Box::pin(async move { self.nearest(latitude, longitude) })
    }
}

#[cfg(test)]
mod tests {
    use super::{GeocodeError, Geocoder, StaticGeocoder};

    fn geocoder() -> StaticGeocoder {
        StaticGeocoder::new()
            .with_entry("Moscow", 55.7558, 37.6173)
            .with_entry("Saint Petersburg", 59.9343, 30.3351)
    }

    #[tokio::test]
    async fn forward_lookup_ignores_case() {
        let hit = geocoder().geocode("  moscow ").await.unwrap();
        assert_eq!(hit.formatted_address, "Moscow");
        assert_eq!(
            geocoder().geocode("Atlantis").await,
            Err(GeocodeError::NotFound("Atlantis".into()))
        );
    }

    #[tokio::test]
    async fn reverse_lookup_picks_nearest_within_radius() {
        let hit = geocoder().reverse_geocode(55.75, 37.61).await.unwrap();
        assert_eq!(hit.formatted_address, "Moscow");
        assert!(geocoder().reverse_geocode(0.0, 0.0).await.is_err());
        assert!(matches!(
            geocoder().reverse_geocode(95.0, 0.0).await,
            Err(GeocodeError::InvalidCoordinates { .. })
        ));
    }
}
