//! Configuration
//!
//! Settings for a geocoding session: provider order and credentials,
//! concurrency, bridge strategy and HTTP connection parameters.
//!
//! # Priority
//!
//! Values are layered, highest first:
//! 1. CLI arguments (applied by the caller)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Defaults
//!
//! The file lives at `$XDG_CONFIG_HOME/geostream/config.toml` by default.
//!
//! # Example
//!
//! ```toml
//! concurrency_limit = 4
//! channel_capacity = 128
//! bridge = "thread"
//! providers = ["google", "esri"]
//!
//! [connection]
//! connect_timeout_ms = 5000
//! request_timeout_ms = 30000
//!
//! [google]
//! api_key = "..."
//!
//! [esri]
//! client_id = "..."
//! client_secret = "..."
//! ```
//!
//! # Environment
//!
//! | Variable                     | Field                |
//! |------------------------------|----------------------|
//! | `GOOGLE_API_KEY`             | `google.api_key`     |
//! | `ESRI_CLIENT_ID`             | `esri.client_id`     |
//! | `ESRI_CLIENT_SECRET`         | `esri.client_secret` |
//! | `GEOSTREAM_CONCURRENCY`      | `concurrency_limit`  |
//! | `GEOSTREAM_CHANNEL_CAPACITY` | `channel_capacity`   |
//! | `GEOSTREAM_BRIDGE`           | `bridge`             |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bridge::BridgeStrategy;

/// Default per-provider concurrency limit
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 2;

/// Default number of results buffered by the thread bridge
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file at {path}: {source}")]
    Io {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A provider is listed without its credentials
    #[error("provider '{0}' is enabled but has no credentials")]
    MissingCredentials(ProviderKind),
}

// =============================================================================
// Sections
// =============================================================================

/// Geocoding services that can appear in the fallback chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Geocoding API
    Google,
    /// Esri ArcGIS World geocoder
    Esri,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Esri => write!(f, "esri"),
        }
    }
}

/// HTTP connection parameters shared by all providers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// TCP/TLS connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// `User-Agent` header sent to providers
    pub user_agent: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            request_timeout_ms: 30_000,
            user_agent: format!("geostream/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Google API key
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleCredentials {
    /// API key with the Geocoding API enabled
    pub api_key: String,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Esri OAuth client credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsriCredentials {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

impl std::fmt::Debug for EsriCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsriCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Settings for a geocoding session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Maximum in-flight requests per provider
    pub concurrency_limit: usize,

    /// Results buffered ahead of a slow consumer (thread bridge)
    pub channel_capacity: usize,

    /// How batches are exposed to synchronous callers
    pub bridge: BridgeStrategy,

    /// Fallback order; the first entry is tried first
    pub providers: Vec<ProviderKind>,

    /// HTTP connection parameters
    pub connection: ConnectionConfig,

    /// Google credentials
    pub google: Option<GoogleCredentials>,

    /// Esri credentials
    pub esri: Option<EsriCredentials>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            bridge: BridgeStrategy::default(),
            providers: vec![ProviderKind::Google, ProviderKind::Esri],
            connection: ConnectionConfig::default(),
            google: None,
            esri: None,
        }
    }
}

/// Default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/geostream/config.toml`, or the platform
/// equivalent. `None` if no config directory can be determined.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("geostream").join("config.toml"))
}

impl GeocoderConfig {
    /// Defaults overlaid with environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env_overrides()
    }

    /// Parse a TOML config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;

        info!(path = %path.display(), "Loaded configuration from file");
        Ok(config)
    }

    /// File (if it exists) overlaid with environment variables
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) if path.exists() => Self::load_from_path(path)?,
            Some(path) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        Ok(base.apply_env_overrides())
    }

    /// Apply environment variable overrides
    #[must_use]
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = lookup("GOOGLE_API_KEY") {
            self.google = Some(GoogleCredentials { api_key });
        }

        match (lookup("ESRI_CLIENT_ID"), lookup("ESRI_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => {
                self.esri = Some(EsriCredentials {
                    client_id,
                    client_secret,
                });
            }
            (client_id, client_secret) => {
                if let Some(esri) = self.esri.as_mut() {
                    if let Some(id) = client_id {
                        esri.client_id = id;
                    }
                    if let Some(secret) = client_secret {
                        esri.client_secret = secret;
                    }
                } else if client_id.is_some() || client_secret.is_some() {
                    warn!("Only one of ESRI_CLIENT_ID / ESRI_CLIENT_SECRET is set, ignoring");
                }
            }
        }

        if let Some(value) = lookup("GEOSTREAM_CONCURRENCY") {
            match value.trim().parse() {
                Ok(limit) => self.concurrency_limit = limit,
                Err(_) => warn!(value = %value, "Ignoring invalid GEOSTREAM_CONCURRENCY"),
            }
        }
        if let Some(value) = lookup("GEOSTREAM_CHANNEL_CAPACITY") {
            match value.trim().parse() {
                Ok(capacity) => self.channel_capacity = capacity,
                Err(_) => warn!(value = %value, "Ignoring invalid GEOSTREAM_CHANNEL_CAPACITY"),
            }
        }
        if let Some(value) = lookup("GEOSTREAM_BRIDGE") {
            match value.parse() {
                Ok(strategy) => self.bridge = strategy,
                Err(e) => warn!(error = %e, "Ignoring invalid GEOSTREAM_BRIDGE"),
            }
        }

        self
    }

    /// Check limits and that every listed provider has credentials
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::Invalid(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be at least 1".to_string(),
            ));
        }

        for kind in &self.providers {
            let configured = match kind {
                ProviderKind::Google => self.google.is_some(),
                ProviderKind::Esri => self.esri.is_some(),
            };
            if !configured {
                return Err(ConfigError::MissingCredentials(*kind));
            }
        }

        Ok(())
    }
}
