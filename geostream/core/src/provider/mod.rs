//! Geocoding Providers
//!
//! Access to external geocoding services through a common adapter trait.
//!
//! # Available Providers
//!
//! - **Google**: Google Geocoding API (API key)
//! - **Esri**: ArcGIS World geocoder (OAuth client credentials)
//!
//! # Layers
//!
//! ```text
//! RateLimitedProvider   <-- permits, status mapping, auth retry, stats
//!        |
//! ProviderAdapter       <-- prepare_request / parse_response per provider
//!        |
//! HttpTransport         <-- reqwest in production, scripted in tests
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use geostream_core::provider::{GoogleAdapter, RateLimitedProvider, ReqwestTransport};
//!
//! let transport = Arc::new(ReqwestTransport::new(&Default::default())?);
//! let google = RateLimitedProvider::new(GoogleAdapter::new(api_key), transport, 2);
//! let location = google.geocode("1600 Amphitheatre Pkwy").await?;
//! ```

pub mod esri;
pub mod google;
mod http;
mod limited;
mod metrics;
mod token;
mod traits;

pub use esri::EsriAdapter;
pub use google::GoogleAdapter;
pub use http::{
    HttpMethod, HttpTransport, PreparedRequest, RawResponse, ReqwestTransport, TransportError,
};
pub use limited::RateLimitedProvider;
pub use metrics::ProviderStats;
pub use token::TokenCache;
pub use traits::ProviderAdapter;
