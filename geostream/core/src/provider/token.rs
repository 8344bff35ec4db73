//! Cached Bearer Tokens
//!
//! Providers with OAuth-style auth keep one token per adapter. The token is
//! fetched lazily on first use and refreshed after the provider rejects it.
//!
//! Reads take a short `parking_lot` read lock. Fetches are serialized by an
//! async mutex and re-check the cache after acquiring it, so a cold start
//! with many concurrent callers issues exactly one token request.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::error::GeocoderError;

/// Adapter-local token cache
#[derive(Debug, Default)]
pub struct TokenCache {
    token: RwLock<Option<String>>,
    refresh_lock: Mutex<()>,
    fetches: AtomicU64,
}

impl TokenCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token, if any
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Number of successful fetches performed through this cache
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Return the cached token, fetching one if the cache is empty
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String, GeocoderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, GeocoderError>>,
    {
        if let Some(token) = self.current() {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(token) = self.current() {
            return Ok(token);
        }

        let token = fetch().await?;
        self.fetches.fetch_add(1, Ordering::Relaxed);
        *self.token.write() = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token if it is still `rejected`.
    ///
    /// Returns `false` when the cache already holds a different token, i.e.
    /// someone else refreshed after `rejected` was handed out.
    pub fn invalidate_if_current(&self, rejected: &str) -> bool {
        let mut token = self.token.write();
        if token.as_deref() == Some(rejected) {
            *token = None;
            true
        } else {
            false
        }
    }
}
