//! Google Geocoding Adapter
//!
//! Google reports most failures inside a 200 response through the `status`
//! field, so the adapter maps that field before looking at results:
//!
//! | `status` | Error |
//! |---|---|
//! | `OK` | - |
//! | `ZERO_RESULTS` | `FailedGeocode` |
//! | `OVER_DAILY_LIMIT`, `OVER_QUERY_LIMIT` | `RateLimit` |
//! | `REQUEST_DENIED` | `BadAuth` |
//! | anything else | `Other` |
//!
//! The API key never changes at runtime, so auth failures are not retried.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::http::{HttpTransport, PreparedRequest};
use super::traits::ProviderAdapter;
use crate::error::GeocoderError;
use crate::location::GeocodedLocation;

/// Public Google geocoding endpoint
pub const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Adapter for the Google Geocoding API
#[derive(Clone, Debug)]
pub struct GoogleAdapter {
    api_key: String,
    url: String,
}

impl GoogleAdapter {
    /// Create an adapter using the public endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: GOOGLE_GEOCODE_URL.to_string(),
        }
    }

    /// Point the adapter at a different endpoint
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Deserialize)]
struct GoogleBody {
    status: String,
    results: Option<Vec<GoogleResult>>,
}

#[derive(Deserialize)]
struct GoogleResult {
    formatted_address: String,
    geometry: GoogleGeometry,
}

#[derive(Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
}

#[derive(Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

fn status_error(status: &str) -> GeocoderError {
    match status {
        "ZERO_RESULTS" => GeocoderError::FailedGeocode,
        "OVER_DAILY_LIMIT" | "OVER_QUERY_LIMIT" => GeocoderError::RateLimit,
        "REQUEST_DENIED" => GeocoderError::BadAuth,
        _ => GeocoderError::Other,
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &str {
        "google"
    }

    async fn prepare_request(
        &self,
        address: &str,
        _transport: &dyn HttpTransport,
    ) -> Result<PreparedRequest, GeocoderError> {
        Ok(PreparedRequest::get(&self.url)
            .with_query("address", address)
            .with_query("key", &self.api_key))
    }

    fn parse_response(
        &self,
        address: &str,
        body: &serde_json::Value,
    ) -> Result<GeocodedLocation, GeocoderError> {
        let status = body.get("status").and_then(serde_json::Value::as_str);
        if let Some(status) = status.filter(|s| *s != "OK") {
            warn!(provider = "google", address = %address, status = %status, "Geocode failed");
            return Err(status_error(status));
        }

        let parsed = GoogleBody::deserialize(body).map_err(|e| {
            warn!(provider = "google", address = %address, error = %e, "Invalid response format");
            GeocoderError::Other
        })?;

        let Some(results) = parsed.results else {
            warn!(provider = "google", address = %address, status = %parsed.status, "Response has no results field");
            return Err(GeocoderError::Other);
        };

        let Some(first) = results.into_iter().next() else {
            warn!(provider = "google", address = %address, "No results");
            return Err(GeocoderError::FailedGeocode);
        };

        Ok(GeocodedLocation::new(
            address,
            first.geometry.location.lat,
            first.geometry.location.lng,
            first.formatted_address,
        ))
    }
}
