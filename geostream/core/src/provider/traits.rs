//! Provider Adapter Trait
//!
//! Every geocoding provider is an adapter with two required operations:
//! turning an address into a [`PreparedRequest`] and turning the decoded
//! response body into a [`GeocodedLocation`]. Sending, concurrency limits,
//! status mapping and the auth retry are shared and live in
//! [`RateLimitedProvider`](super::RateLimitedProvider).

use async_trait::async_trait;

use super::http::{HttpTransport, PreparedRequest};
use crate::error::GeocoderError;
use crate::location::GeocodedLocation;

/// A geocoding provider's request/response contract
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name used in logs and stats (e.g. "google")
    fn name(&self) -> &str;

    /// Build the geocode request for `address`.
    ///
    /// Adapters with token auth may fetch a token through `transport` here.
    async fn prepare_request(
        &self,
        address: &str,
        transport: &dyn HttpTransport,
    ) -> Result<PreparedRequest, GeocoderError>;

    /// Turn a decoded 2xx body into a location
    fn parse_response(
        &self,
        address: &str,
        body: &serde_json::Value,
    ) -> Result<GeocodedLocation, GeocoderError>;

    /// Map a non-2xx status to an error
    fn map_status(&self, status: u16) -> GeocoderError {
        GeocoderError::from_status(status)
    }

    /// Forget the credentials used by `rejected` after a `BadAuth`.
    ///
    /// Returning `true` asks the caller to retry the call exactly once.
    fn invalidate_credentials(&self, rejected: &PreparedRequest) -> bool {
        let _ = rejected;
        false
    }
}
