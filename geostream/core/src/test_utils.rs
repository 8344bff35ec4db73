//! Shared test doubles

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::provider::{HttpTransport, PreparedRequest, RawResponse, TransportError};

type Handler = Box<dyn Fn(&PreparedRequest) -> Result<RawResponse, TransportError> + Send + Sync>;
type LatencyFn = Box<dyn Fn(&PreparedRequest) -> Duration + Send + Sync>;

/// Scripted transport: answers every request through a closure
pub struct MockTransport {
    handler: Handler,
    latency: LatencyFn,
    requests: Mutex<Vec<PreparedRequest>>,
    calls_by_url: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&PreparedRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            latency: Box::new(|_| Duration::ZERO),
            requests: Mutex::new(Vec::new()),
            calls_by_url: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.with_latency_fn(move |_| latency)
    }

    pub fn with_latency_fn<F>(mut self, latency: F) -> Self
    where
        F: Fn(&PreparedRequest) -> Duration + Send + Sync + 'static,
    {
        self.latency = Box::new(latency);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls_by_url.lock().get(url).copied().unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request.clone());
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

pub fn json_reply(status: u16, body: serde_json::Value) -> Result<RawResponse, TransportError> {
    Ok(RawResponse::new(status, body.to_string()))
}

pub fn google_ok(lat: f64, lng: f64) -> Result<RawResponse, TransportError> {
    json_reply(
        200,
        json!({
            "status": "OK",
            "results": [{
                "formatted_address": "Mocked Geocoded Address in Google Response",
                "geometry": { "location": { "lat": lat, "lng": lng } }
            }]
        }),
    )
}
