//! geostream Core - Concurrent Batch Geocoding
//!
//! Resolves batches of free-form addresses to coordinates through an
//! ordered chain of external geocoding providers, with a per-provider
//! concurrency cap, results streamed as they become available, and a
//! blocking iterator for callers without an async runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Callers                                  │
//! │   ┌──────────────────────┐          ┌─────────────────────────┐  │
//! │   │  sync: GeocodeIter   │          │  async: BoxStream       │  │
//! │   │  (thread | pump)     │          │  (geocode_stream)       │  │
//! │   └──────────┬───────────┘          └────────────┬────────────┘  │
//! └──────────────┼───────────────────────────────────┼───────────────┘
//!                └─────────────────┬─────────────────┘
//! ┌────────────────────────────────┼─────────────────────────────────┐
//! │                         GEOSTREAM CORE                           │
//! │  ┌─────────────────────────────┴──────────────────────────────┐  │
//! │  │  BatchDispatcher   one task per address, ordered or        │  │
//! │  │                    completion delivery                     │  │
//! │  └─────────────────────────────┬──────────────────────────────┘  │
//! │  ┌─────────────────────────────┴──────────────────────────────┐  │
//! │  │  FallbackGeocoder  google ─► esri ─► Null Island           │  │
//! │  └─────────────────────────────┬──────────────────────────────┘  │
//! │  ┌──────────────────┐  ┌───────┴──────────┐  ┌──────────────┐    │
//! │  │ RateLimited      │  │ ProviderAdapter  │  │ TokenCache   │    │
//! │  │ Provider (permit)│  │ (google, esri)   │  │ (esri OAuth) │    │
//! │  └──────────────────┘  └───────┬──────────┘  └──────────────┘    │
//! │                        ┌───────┴──────────┐                      │
//! │                        │  HttpTransport   │                      │
//! │                        └──────────────────┘                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`BatchGeocoder`]: entry point wiring config, providers and a bridge
//! - [`GeocodedLocation`]: one result per input address
//! - [`GeocoderError`]: why a single provider call failed
//! - [`DeliveryMode`]: input order or completion order
//! - [`GeocodeIter`]: blocking iterator over a batch
//!
//! # Quick Start
//!
//! ```ignore
//! use geostream_core::{geocode_batch, DeliveryMode};
//!
//! let addresses = vec!["1600 Amphitheatre Pkwy, Mountain View".to_string()];
//! for location in geocode_batch(addresses, DeliveryMode::Ordered, 2)? {
//!     println!("{} -> {}, {}", location.address(), location.lat(), location.lon());
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod geocoder;
pub mod location;
pub mod provider;

#[cfg(test)]
mod test_utils;

pub use bridge::{BridgeError, BridgeStrategy, GeocodeIter, PumpBridge, ThreadBridge};
pub use config::{
    default_config_path, ConfigError, ConnectionConfig, EsriCredentials, GeocoderConfig,
    GoogleCredentials, ProviderKind,
};
pub use dispatch::{BatchDispatcher, DeliveryMode};
pub use error::{Error, GeocoderError};
pub use fallback::{FallbackGeocoder, Geocode};
pub use geocoder::{geocode_batch, BatchGeocoder, BatchOptions};
pub use location::{round_coordinate, GeocodedLocation, UNRESOLVED_LABEL};
pub use provider::{ProviderAdapter, ProviderStats, RateLimitedProvider};
