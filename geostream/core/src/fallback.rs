//! Fallback Geocoding
//!
//! Composes providers into a fixed-priority chain. For each address the
//! chain tries providers in construction order and returns the first
//! success. Every [`GeocoderError`](crate::GeocoderError) variant is
//! absorbed and moves on to the next provider; when the chain is exhausted
//! the address resolves to the Null-Island sentinel.
//!
//! This keeps one bad address (or one failing provider) from aborting a
//! batch. `BadAuth` is treated like any other failure here, even though it
//! usually means a misconfigured credential rather than a bad address.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::location::GeocodedLocation;
use crate::provider::RateLimitedProvider;

/// Anything that turns one address into a location without failing
#[async_trait]
pub trait Geocode: Send + Sync {
    /// Resolve `address`; unresolvable addresses yield the sentinel
    async fn geocode(&self, address: &str) -> GeocodedLocation;
}

/// Ordered chain of providers
#[derive(Clone, Debug, Default)]
pub struct FallbackGeocoder {
    providers: Vec<Arc<RateLimitedProvider>>,
}

impl FallbackGeocoder {
    /// Create a chain; the first provider has the highest priority
    #[must_use]
    pub fn new(providers: Vec<Arc<RateLimitedProvider>>) -> Self {
        Self { providers }
    }

    /// Providers in priority order
    #[must_use]
    pub fn providers(&self) -> &[Arc<RateLimitedProvider>] {
        &self.providers
    }

    /// Resolve one address through the chain
    pub async fn geocode_one(&self, address: &str) -> GeocodedLocation {
        for (position, provider) in self.providers.iter().enumerate() {
            match provider.geocode(address).await {
                Ok(location) => {
                    if position > 0 {
                        debug!(
                            provider = %provider.name(),
                            address = %address,
                            position,
                            "Resolved by fallback provider"
                        );
                    }
                    return location;
                }
                Err(e) => {
                    debug!(
                        provider = %provider.name(),
                        address = %address,
                        error = %e,
                        "Provider failed, trying next"
                    );
                }
            }
        }

        warn!(address = %address, providers = self.providers.len(), "Could not geocode address");
        GeocodedLocation::null_island(address)
    }
}

#[async_trait]
impl Geocode for FallbackGeocoder {
    async fn geocode(&self, address: &str) -> GeocodedLocation {
        self.geocode_one(address).await
    }
}
