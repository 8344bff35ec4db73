//! HTTP Transport
//!
//! The seam between provider adapters and the network. Adapters describe a
//! request as a [`PreparedRequest`]; an [`HttpTransport`] sends it and hands
//! back the status code and body. Production code uses
//! [`ReqwestTransport`]; tests substitute a scripted transport.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ConnectionConfig;

/// HTTP method of a prepared request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET with query parameters
    Get,
    /// POST with query parameters
    Post,
}

/// A provider-specific request, ready to send
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL without query string
    pub url: String,
    /// Query parameters, in insertion order
    pub query: Vec<(String, String)>,
}

impl PreparedRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
        }
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Look up the first value of a query parameter
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failures
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or no response arrived
    #[error("request failed: {0}")]
    Send(String),

    /// The response body could not be read
    #[error("could not read response body: {0}")]
    Body(String),

    /// The HTTP client could not be constructed
    #[error("could not build HTTP client: {0}")]
    Client(String),
}

/// Sends prepared requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request and return status and body
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from connection settings
    pub fn new(config: &ConnectionConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        let response = builder
            .query(&request.query)
            .send()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}
