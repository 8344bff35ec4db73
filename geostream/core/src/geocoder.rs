//! Batch Geocoder
//!
//! Wires configuration, providers, the dispatcher and a bridge into a
//! single entry point.

use std::sync::Arc;

use futures::stream::BoxStream;
use tracing::info;

use crate::bridge::{BridgeStrategy, GeocodeIter};
use crate::config::{ConfigError, GeocoderConfig, ProviderKind, DEFAULT_CHANNEL_CAPACITY};
use crate::dispatch::{BatchDispatcher, DeliveryMode};
use crate::error::Error;
use crate::fallback::{FallbackGeocoder, Geocode};
use crate::location::GeocodedLocation;
use crate::provider::{
    EsriAdapter, GoogleAdapter, HttpTransport, ProviderStats, RateLimitedProvider,
    ReqwestTransport,
};

/// How results are handed to synchronous callers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    /// Results buffered ahead of the consumer (thread bridge only)
    pub channel_capacity: usize,
    /// Bridge strategy
    pub strategy: BridgeStrategy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            strategy: BridgeStrategy::default(),
        }
    }
}

impl From<&GeocoderConfig> for BatchOptions {
    fn from(config: &GeocoderConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity,
            strategy: config.bridge,
        }
    }
}

/// Geocodes batches of addresses through a fallback chain
#[derive(Clone, Debug)]
pub struct BatchGeocoder {
    dispatcher: BatchDispatcher,
    options: BatchOptions,
    providers: Vec<Arc<RateLimitedProvider>>,
}

impl BatchGeocoder {
    /// Geocode through any [`Geocode`] implementation
    pub fn new(geocoder: Arc<dyn Geocode>, options: BatchOptions) -> Self {
        Self {
            dispatcher: BatchDispatcher::new(geocoder),
            options,
            providers: Vec::new(),
        }
    }

    /// Build the provider chain described by `config` over HTTP
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, lists no providers, or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &GeocoderConfig) -> Result<Self, Error> {
        let transport = Arc::new(ReqwestTransport::new(&config.connection)?);
        Self::from_config_with_transport(config, transport)
    }

    /// Like [`from_config`](Self::from_config) with a caller-supplied transport
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or lists no providers.
    pub fn from_config_with_transport(
        config: &GeocoderConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, Error> {
        config.validate()?;
        if config.providers.is_empty() {
            return Err(Error::NoProviders);
        }

        let providers = config
            .providers
            .iter()
            .map(|kind| build_provider(*kind, config, Arc::clone(&transport)))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            providers = ?config.providers,
            concurrency_limit = config.concurrency_limit,
            bridge = %config.bridge,
            "Geocoder ready"
        );

        let chain = FallbackGeocoder::new(providers.clone());
        Ok(Self {
            dispatcher: BatchDispatcher::new(Arc::new(chain)),
            options: BatchOptions::from(config),
            providers,
        })
    }

    /// The options batches are started with
    #[must_use]
    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Start a batch and return a blocking iterator over its results.
    ///
    /// Geocoding starts immediately. Must not be called from async code;
    /// use [`geocode_stream`](Self::geocode_stream) there.
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge cannot start its runtime or thread.
    pub fn geocode_batch(
        &self,
        addresses: Vec<String>,
        mode: DeliveryMode,
    ) -> Result<GeocodeIter, Error> {
        let iter = GeocodeIter::start(
            self.options.strategy,
            self.dispatcher.clone(),
            addresses,
            mode,
            self.options.channel_capacity,
        )?;
        Ok(iter)
    }

    /// Start a batch on the current runtime and stream its results
    pub fn geocode_stream(
        &self,
        addresses: Vec<String>,
        mode: DeliveryMode,
    ) -> BoxStream<'static, GeocodedLocation> {
        self.dispatcher.dispatch(addresses, mode)
    }

    /// Per-provider counters, in fallback order
    ///
    /// Empty when built with [`new`](Self::new).
    #[must_use]
    pub fn provider_stats(&self) -> Vec<(String, ProviderStats)> {
        self.providers
            .iter()
            .map(|provider| (provider.name().to_string(), provider.stats()))
            .collect()
    }
}

fn build_provider(
    kind: ProviderKind,
    config: &GeocoderConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<Arc<RateLimitedProvider>, ConfigError> {
    let limit = config.concurrency_limit;
    let provider = match kind {
        ProviderKind::Google => {
            let credentials = config
                .google
                .as_ref()
                .ok_or(ConfigError::MissingCredentials(kind))?;
            RateLimitedProvider::new(GoogleAdapter::new(&credentials.api_key), transport, limit)
        }
        ProviderKind::Esri => {
            let credentials = config
                .esri
                .as_ref()
                .ok_or(ConfigError::MissingCredentials(kind))?;
            RateLimitedProvider::new(
                EsriAdapter::new(&credentials.client_id, &credentials.client_secret),
                transport,
                limit,
            )
        }
    };
    Ok(Arc::new(provider))
}

/// Geocode `addresses` with providers configured from the environment.
///
/// Shorthand for [`GeocoderConfig::from_env`] with `concurrency_limit`
/// overridden, followed by [`BatchGeocoder::geocode_batch`] over HTTP.
///
/// # Errors
///
/// Returns an error if credentials are missing, the limit is zero, or the
/// bridge cannot start.
pub fn geocode_batch(
    addresses: Vec<String>,
    mode: DeliveryMode,
    concurrency_limit: usize,
) -> Result<GeocodeIter, Error> {
    let config = GeocoderConfig::from_env();
    let transport = Arc::new(ReqwestTransport::new(&config.connection)?);
    run_batch(config, transport, addresses, mode, concurrency_limit)
}

fn run_batch(
    config: GeocoderConfig,
    transport: Arc<dyn HttpTransport>,
    addresses: Vec<String>,
    mode: DeliveryMode,
    concurrency_limit: usize,
) -> Result<GeocodeIter, Error> {
    let config = GeocoderConfig {
        concurrency_limit,
        ..config
    };
    BatchGeocoder::from_config_with_transport(&config, transport)?.geocode_batch(addresses, mode)
}
