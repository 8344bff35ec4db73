//! Provider Metrics
//!
//! Lock-free counters kept by every rate-limited provider. Reads go through
//! [`ProviderStats`], a plain snapshot.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Snapshot of a provider's counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderStats {
    /// Requests sent to the provider (retries and token fetches included)
    pub requests: u64,
    /// Calls that produced a location
    pub successes: u64,
    /// Calls that ended in an error
    pub failures: u64,
    /// Calls retried after refreshing credentials
    pub auth_retries: u64,
    /// Requests currently holding a concurrency permit
    pub in_flight: usize,
    /// Highest `in_flight` observed
    pub peak_in_flight: usize,
}

/// Atomic counters for lock-free updates
#[derive(Debug, Default)]
pub(crate) struct ProviderStatsAtomic {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    auth_retries: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ProviderStatsAtomic {
    pub(crate) fn snapshot(&self) -> ProviderStats {
        ProviderStats {
            requests: self.requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            auth_retries: self.auth_retries.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }

    /// Record a request entering the provider; returns a guard that marks
    /// it finished when dropped
    pub(crate) fn begin_request(&self) -> InFlightGuard<'_> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let mut peak = self.peak_in_flight.load(Ordering::SeqCst);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(x) => peak = x,
            }
        }
        InFlightGuard { stats: self }
    }

    pub(crate) fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_auth_retry(&self) {
        self.auth_retries.fetch_add(1, Ordering::Relaxed);
    }
}

/// Decrements the in-flight counter on drop
pub(crate) struct InFlightGuard<'a> {
    stats: &'a ProviderStatsAtomic,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
