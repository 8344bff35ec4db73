//! Rate-Limited Provider
//!
//! Shared call behavior for every [`ProviderAdapter`]:
//!
//! 1. prepare the request (may fetch credentials)
//! 2. wait for a concurrency permit, send, release the permit
//! 3. map transport failures, non-2xx statuses and undecodable bodies to
//!    [`GeocoderError`] variants
//! 4. hand the decoded body to the adapter
//!
//! A `BadAuth` outcome gives the adapter one chance to drop its credentials;
//! if it does, the call is repeated exactly once.
//!
//! # Concurrency
//!
//! Each provider owns a semaphore sized to its concurrency limit. Callers in
//! excess of the limit suspend until a permit frees up; nothing is rejected
//! and no ordering among waiters is promised.
//!
//! Adapters only ever see the permit-gated transport, so credential requests made
//! while preparing a call hold a permit too and count against the same limit.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::http::{HttpTransport, PreparedRequest, RawResponse, TransportError};
use super::metrics::{ProviderStats, ProviderStatsAtomic};
use super::traits::ProviderAdapter;
use crate::error::GeocoderError;
use crate::location::GeocodedLocation;

/// Longest body excerpt written to logs
const LOG_BODY_LIMIT: usize = 200;

/// A provider adapter behind a concurrency cap
pub struct RateLimitedProvider {
    adapter: Box<dyn ProviderAdapter>,
    transport: Arc<dyn HttpTransport>,
    semaphore: Semaphore,
    concurrency_limit: usize,
    stats: ProviderStatsAtomic,
}

impl RateLimitedProvider {
    /// Wrap `adapter`, allowing at most `concurrency_limit` requests in flight.
    ///
    /// A limit of zero is treated as one.
    pub fn new(
        adapter: impl ProviderAdapter + 'static,
        transport: Arc<dyn HttpTransport>,
        concurrency_limit: usize,
    ) -> Self {
        let concurrency_limit = concurrency_limit.max(1);
        Self {
            adapter: Box::new(adapter),
            transport,
            semaphore: Semaphore::new(concurrency_limit),
            concurrency_limit,
            stats: ProviderStatsAtomic::default(),
        }
    }

    /// Provider name
    #[must_use]
    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    /// Maximum concurrent in-flight requests
    #[must_use]
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> ProviderStats {
        self.stats.snapshot()
    }

    /// Geocode one address with this provider
    pub async fn geocode(&self, address: &str) -> Result<GeocodedLocation, GeocoderError> {
        let (request, result) = self.attempt(address).await;

        let result = match (result, request) {
            (Err(GeocoderError::BadAuth), Some(rejected))
                if self.adapter.invalidate_credentials(&rejected) =>
            {
                info!(
                    provider = %self.name(),
                    address = %address,
                    "Credentials rejected, retrying once with fresh credentials"
                );
                self.stats.record_auth_retry();
                self.attempt(address).await.1
            }
            (result, _) => result,
        };

        match &result {
            Ok(_) => self.stats.record_success(),
            Err(_) => self.stats.record_failure(),
        }
        result
    }

    fn gated(&self) -> GatedTransport<'_> {
        GatedTransport {
            inner: self.transport.as_ref(),
            semaphore: &self.semaphore,
            stats: &self.stats,
        }
    }

    /// One prepare-send-parse round; also returns the request that was sent
    async fn attempt(
        &self,
        address: &str,
    ) -> (Option<PreparedRequest>, Result<GeocodedLocation, GeocoderError>) {
        let request = match self.adapter.prepare_request(address, &self.gated()).await {
            Ok(request) => request,
            Err(e) => {
                warn!(provider = %self.name(), address = %address, error = %e, "Could not prepare request");
                return (None, Err(e));
            }
        };

        let result = self.send(address, &request).await;
        (Some(request), result)
    }

    async fn send(
        &self,
        address: &str,
        request: &PreparedRequest,
    ) -> Result<GeocodedLocation, GeocoderError> {
        debug!(provider = %self.name(), address = %address, "Sending geocode request");
        let response = self.gated().send(request).await.map_err(|e| {
            warn!(provider = %self.name(), address = %address, error = %e, "Transport failure");
            GeocoderError::Connection
        })?;

        if !response.is_success() {
            let error = self.adapter.map_status(response.status);
            warn!(
                provider = %self.name(),
                address = %address,
                status = response.status,
                body = %excerpt(&response.body),
                error = %error,
                "Provider returned error status"
            );
            return Err(error);
        }

        let body: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| {
            warn!(
                provider = %self.name(),
                address = %address,
                error = %e,
                body = %excerpt(&response.body),
                "Could not decode response body"
            );
            GeocoderError::Other
        })?;

        self.adapter.parse_response(address, &body)
    }
}

impl std::fmt::Debug for RateLimitedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedProvider")
            .field("name", &self.name())
            .field("concurrency_limit", &self.concurrency_limit)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

/// The provider's transport behind its concurrency permit
struct GatedTransport<'a> {
    inner: &'a dyn HttpTransport,
    semaphore: &'a Semaphore,
    stats: &'a ProviderStatsAtomic,
}

#[async_trait]
impl<'a> HttpTransport for GatedTransport<'a> {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| TransportError::Send("provider permits closed".to_string()))?;
        let _in_flight = self.stats.begin_request();
        self.inner.send(request).await
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
