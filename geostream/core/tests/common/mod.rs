//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use geostream_core::provider::{HttpTransport, PreparedRequest, RawResponse, TransportError};
use geostream_core::{EsriCredentials, GeocoderConfig, GoogleCredentials, ProviderKind};

pub use geostream_core::provider::esri::{ESRI_GEOCODE_URL, ESRI_TOKEN_URL};
pub use geostream_core::provider::google::GOOGLE_GEOCODE_URL;

type Handler = Box<dyn Fn(&PreparedRequest) -> Result<RawResponse, TransportError> + Send + Sync>;
type LatencyFn = Box<dyn Fn(&PreparedRequest) -> Duration + Send + Sync>;

/// Scripted provider backend standing in for the real HTTP services
pub struct FakeBackend {
    handler: Handler,
    latency: LatencyFn,
    calls_by_url: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&PreparedRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            latency: Box::new(|_| Duration::ZERO),
            calls_by_url: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&PreparedRequest) -> Duration + Send + Sync + 'static,
    {
        self.latency = Box::new(latency);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls_by_url.lock().get(url).copied().unwrap_or(0)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for FakeBackend {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        *self
            .calls_by_url
            .lock()
            .entry(request.url.clone())
            .or_default() += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = (self.latency)(request);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.handler)(request)
    }
}

pub fn reply(status: u16, body: serde_json::Value) -> Result<RawResponse, TransportError> {
    Ok(RawResponse::new(status, body.to_string()))
}

pub fn google_hit(lat: f64, lng: f64, label: &str) -> Result<RawResponse, TransportError> {
    reply(
        200,
        json!({
            "status": "OK",
            "results": [{
                "formatted_address": label,
                "geometry": { "location": { "lat": lat, "lng": lng } }
            }]
        }),
    )
}

pub fn google_zero_results() -> Result<RawResponse, TransportError> {
    reply(200, json!({ "status": "ZERO_RESULTS", "results": [] }))
}

pub fn esri_token(token: &str) -> Result<RawResponse, TransportError> {
    reply(200, json!({ "access_token": token, "expires_in": 300 }))
}

pub fn esri_hit(lat: f64, lon: f64, label: &str) -> Result<RawResponse, TransportError> {
    reply(
        200,
        json!({
            "candidates": [{
                "address": label,
                "location": { "x": lon, "y": lat },
                "score": 100
            }]
        }),
    )
}

pub fn esri_no_candidates() -> Result<RawResponse, TransportError> {
    reply(200, json!({ "candidates": [] }))
}

/// Config with credentials for both providers, in the given fallback order
pub fn config(providers: &[ProviderKind], concurrency_limit: usize) -> GeocoderConfig {
    GeocoderConfig {
        concurrency_limit,
        providers: providers.to_vec(),
        google: Some(GoogleCredentials {
            api_key: "test-key".to_string(),
        }),
        esri: Some(EsriCredentials {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
        }),
        ..GeocoderConfig::default()
    }
}

pub fn addresses(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{i} Test Street")).collect()
}

/// Index encoded in an address built by [`addresses`]
pub fn index_of(address: &str) -> u64 {
    address
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}
