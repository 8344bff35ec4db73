//! Error Types
//!
//! [`GeocoderError`] is the single failure family raised by provider
//! adapters. Variants are bare tags: diagnostic detail (status code, body,
//! address) is logged where the failure is detected, not carried upward.
//!
//! The crate-level [`Error`] covers everything else that can go wrong
//! before a batch starts streaming (configuration, runtime setup).

use thiserror::Error;

use crate::bridge::BridgeError;
use crate::config::ConfigError;
use crate::provider::TransportError;

/// Failure of a single provider call
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum GeocoderError {
    /// Transport-level failure (DNS, TCP, TLS, timeout)
    #[error("could not reach geocoding provider")]
    Connection,

    /// Provider rejected the request as malformed (HTTP 400)
    #[error("provider rejected the request")]
    BadRequest,

    /// Provider rejected the credentials (HTTP 401/403/499 or auth status)
    #[error("provider rejected the credentials")]
    BadAuth,

    /// Provider quota or rate limit exceeded (HTTP 429 or quota status)
    #[error("provider rate limit exceeded")]
    RateLimit,

    /// Provider-side failure (HTTP 5xx)
    #[error("provider server error")]
    Server,

    /// Well-formed response with zero results
    #[error("provider returned no results")]
    FailedGeocode,

    /// Malformed response or unmapped status
    #[error("provider returned an unusable response")]
    Other,
}

impl GeocoderError {
    /// Default mapping from a non-2xx HTTP status to an error variant
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 | 403 | 499 => Self::BadAuth,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }

    /// Whether refreshing credentials could make a retry succeed
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::BadAuth)
    }
}

/// Errors raised while setting up a batch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The sync-over-async bridge could not start
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The HTTP transport could not be built
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No provider is configured, so nothing could ever resolve
    #[error("no geocoding providers configured")]
    NoProviders,
}
