//! Geocoded Locations
//!
//! The result record produced for every input address. A location is built
//! once and never mutated; coordinates are rounded to six decimal places on
//! construction so every provider reports with the same precision.
//!
//! Unresolvable addresses still produce a location: the Null-Island
//! sentinel at (0, 0) labelled [`UNRESOLVED_LABEL`].

use serde::{Deserialize, Serialize};

/// Label carried by the Null-Island sentinel
pub const UNRESOLVED_LABEL: &str = "Could not geocode";

/// Decimal places kept for latitude and longitude
pub const COORDINATE_PRECISION: i32 = 6;

/// Round a coordinate to [`COORDINATE_PRECISION`] decimal places.
///
/// Ties round half away from zero on the scaled value, so the exact tie
/// `12.3456785` becomes `12.345679` and `-12.3456785` becomes `-12.345679`.
#[must_use]
pub fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_PRECISION);
    (value * scale).round() / scale
}

/// A resolved (or explicitly unresolved) address
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "LocationFields")]
pub struct GeocodedLocation {
    address: String,
    lat: f64,
    lon: f64,
    label: String,
}

impl GeocodedLocation {
    /// Create a location, rounding both coordinates
    pub fn new(address: impl Into<String>, lat: f64, lon: f64, label: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            lat: round_coordinate(lat),
            lon: round_coordinate(lon),
            label: label.into(),
        }
    }

    /// The sentinel returned when no provider could resolve `address`
    pub fn null_island(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            lat: 0.0,
            lon: 0.0,
            label: UNRESOLVED_LABEL.to_string(),
        }
    }

    /// Whether this is the Null-Island sentinel
    #[must_use]
    pub fn is_null_island(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0 && self.label == UNRESOLVED_LABEL
    }

    /// The input address as given
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Latitude in decimal degrees
    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in decimal degrees
    #[must_use]
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Normalized address label reported by the provider
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Wire shape of a location; deserializing goes through [`GeocodedLocation::new`]
#[derive(Deserialize)]
struct LocationFields {
    address: String,
    lat: f64,
    lon: f64,
    label: String,
}

impl From<LocationFields> for GeocodedLocation {
    fn from(fields: LocationFields) -> Self {
        Self::new(fields.address, fields.lat, fields.lon, fields.label)
    }
}
