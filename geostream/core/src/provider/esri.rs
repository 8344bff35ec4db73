//! Esri ArcGIS Geocoding Adapter
//!
//! Uses OAuth client credentials. A bearer token is fetched on first use
//! through the same transport as geocode calls, cached in a [`TokenCache`],
//! and dropped when the provider rejects it so the shared call logic can
//! retry once with a fresh one.
//!
//! ArcGIS reports an invalid or expired token either as HTTP 401/403/499 or
//! as a 200 response carrying `error.code` 498/499; both map to `BadAuth`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::http::{HttpTransport, PreparedRequest};
use super::token::TokenCache;
use super::traits::ProviderAdapter;
use crate::error::GeocoderError;
use crate::location::GeocodedLocation;

/// ArcGIS OAuth token endpoint
pub const ESRI_TOKEN_URL: &str = "https://www.arcgis.com/sharing/rest/oauth2/token";

/// ArcGIS World geocoder endpoint
pub const ESRI_GEOCODE_URL: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

/// Token lifetime requested from ArcGIS, in minutes
const TOKEN_EXPIRATION_MINUTES: &str = "5";

/// Fields requested for each candidate
const OUT_FIELDS: &str = "address,location,Score,LongLabel,ShortLabel,Match_addr,postal";

/// ArcGIS error codes meaning the token is invalid or expired
const AUTH_ERROR_CODES: [i64; 2] = [498, 499];

/// Adapter for the Esri ArcGIS World geocoder
#[derive(Debug)]
pub struct EsriAdapter {
    client_id: String,
    client_secret: String,
    token_url: String,
    geocode_url: String,
    tokens: TokenCache,
}

impl EsriAdapter {
    /// Create an adapter using the public ArcGIS endpoints
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: ESRI_TOKEN_URL.to_string(),
            geocode_url: ESRI_GEOCODE_URL.to_string(),
            tokens: TokenCache::new(),
        }
    }

    /// Point the adapter at different token and geocode endpoints
    #[must_use]
    pub fn with_urls(mut self, token_url: impl Into<String>, geocode_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.geocode_url = geocode_url.into();
        self
    }

    /// The adapter's token cache
    #[must_use]
    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    fn token_request(&self) -> PreparedRequest {
        PreparedRequest::post(&self.token_url)
            .with_query("client_id", &self.client_id)
            .with_query("client_secret", &self.client_secret)
            .with_query("grant_type", "client_credentials")
            .with_query("expiration", TOKEN_EXPIRATION_MINUTES)
            .with_query("f", "json")
    }

    async fn fetch_token(&self, transport: &dyn HttpTransport) -> Result<String, GeocoderError> {
        info!(provider = "esri", "Fetching access token");

        let response = transport.send(&self.token_request()).await.map_err(|e| {
            warn!(provider = "esri", error = %e, "Token request failed");
            GeocoderError::Connection
        })?;

        if !response.is_success() {
            warn!(provider = "esri", status = response.status, "Token request rejected");
            return Err(GeocoderError::from_status(response.status));
        }

        let body: TokenBody = serde_json::from_str(&response.body).map_err(|e| {
            warn!(provider = "esri", error = %e, "Could not decode token response");
            GeocoderError::Other
        })?;

        match body {
            TokenBody {
                access_token: Some(token),
                ..
            } => Ok(token),
            TokenBody {
                error: Some(error), ..
            } if AUTH_ERROR_CODES.contains(&error.code) || error.code == 400 => {
                warn!(provider = "esri", code = error.code, "Client credentials rejected");
                Err(GeocoderError::BadAuth)
            }
            _ => {
                warn!(provider = "esri", "Token response has no access_token");
                Err(GeocoderError::Other)
            }
        }
    }
}

#[derive(Deserialize)]
struct TokenBody {
    access_token: Option<String>,
    error: Option<EsriError>,
}

#[derive(Deserialize)]
struct EsriError {
    code: i64,
}

#[derive(Deserialize)]
struct CandidatesBody {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    address: String,
    location: CandidateLocation,
}

#[derive(Deserialize)]
struct CandidateLocation {
    x: f64,
    y: f64,
}

#[async_trait]
impl ProviderAdapter for EsriAdapter {
    fn name(&self) -> &str {
        "esri"
    }

    async fn prepare_request(
        &self,
        address: &str,
        transport: &dyn HttpTransport,
    ) -> Result<PreparedRequest, GeocoderError> {
        let token = self
            .tokens
            .get_or_fetch(|| self.fetch_token(transport))
            .await?;

        Ok(PreparedRequest::get(&self.geocode_url)
            .with_query("SingleLine", address)
            .with_query("f", "json")
            .with_query("token", token)
            .with_query("outFields", OUT_FIELDS)
            .with_query("forStorage", "0"))
    }

    fn parse_response(
        &self,
        address: &str,
        body: &serde_json::Value,
    ) -> Result<GeocodedLocation, GeocoderError> {
        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(serde_json::Value::as_i64);
            warn!(provider = "esri", address = %address, code = ?code, "Geocode failed");
            return Err(match code {
                Some(code) if AUTH_ERROR_CODES.contains(&code) => GeocoderError::BadAuth,
                _ => GeocoderError::Other,
            });
        }

        let Some(candidates) = body.get("candidates").and_then(serde_json::Value::as_array) else {
            warn!(provider = "esri", address = %address, "Response has no candidates field");
            return Err(GeocoderError::Other);
        };

        if candidates.is_empty() {
            warn!(provider = "esri", address = %address, "No results");
            return Err(GeocoderError::FailedGeocode);
        }

        let parsed = CandidatesBody::deserialize(body).map_err(|e| {
            warn!(provider = "esri", address = %address, error = %e, "Invalid response format");
            GeocoderError::Other
        })?;

        let first = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or(GeocoderError::FailedGeocode)?;

        Ok(GeocodedLocation::new(
            address,
            first.location.y,
            first.location.x,
            first.address,
        ))
    }

    fn invalidate_credentials(&self, rejected: &PreparedRequest) -> bool {
        if let Some(token) = rejected.query_value("token") {
            self.tokens.invalidate_if_current(token);
        }
        true
    }
}
