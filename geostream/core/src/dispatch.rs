//! Batch Dispatch
//!
//! Launches one geocode task per address and exposes the results as a
//! stream. Every task is spawned up front; backpressure comes only from the
//! providers' concurrency permits.
//!
//! # Delivery Modes
//!
//! - [`DeliveryMode::Ordered`]: result *i* is released only after results
//!   `0..i`, even if later addresses finish first.
//! - [`DeliveryMode::Completion`]: results are released as tasks finish.
//!
//! # Cardinality
//!
//! The stream yields exactly one location per input address. A task that
//! panics, or that never reports back, contributes the Null-Island sentinel
//! for its address instead of ending the batch.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug_span, error, info, warn, Instrument};

use crate::fallback::Geocode;
use crate::location::GeocodedLocation;

/// Order in which batch results are delivered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Same order as the input addresses
    #[default]
    Ordered,
    /// Order in which geocodes finish
    Completion,
}

impl DeliveryMode {
    /// Lowercase name, as used in config files and logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::Completion => "completion",
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = UnknownDeliveryMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ordered" => Ok(Self::Ordered),
            "completion" => Ok(Self::Completion),
            _ => Err(UnknownDeliveryMode(s.to_string())),
        }
    }
}

/// A delivery mode name that is neither `ordered` nor `completion`
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown delivery mode '{0}' (expected 'ordered' or 'completion')")]
pub struct UnknownDeliveryMode(pub String);

/// Result of one spawned geocode: slot index and location or panic message
type TaskOutcome = (usize, Result<GeocodedLocation, String>);

/// Spawns geocode tasks for a batch of addresses
#[derive(Clone)]
pub struct BatchDispatcher {
    geocoder: Arc<dyn Geocode>,
}

impl BatchDispatcher {
    /// Create a dispatcher that resolves addresses through `geocoder`
    pub fn new(geocoder: Arc<dyn Geocode>) -> Self {
        Self { geocoder }
    }

    /// Start geocoding `addresses` and stream the results.
    ///
    /// Must be called from within a Tokio runtime. Dropping the stream
    /// aborts whatever is still running.
    pub fn dispatch(
        &self,
        addresses: Vec<String>,
        mode: DeliveryMode,
    ) -> BoxStream<'static, GeocodedLocation> {
        info!(count = addresses.len(), mode = %mode, "Dispatching batch");

        let mut tasks = JoinSet::new();
        for (index, address) in addresses.iter().enumerate() {
            let geocoder = Arc::clone(&self.geocoder);
            let address = address.clone();
            tasks.spawn(
                async move {
                    let outcome = AssertUnwindSafe(geocoder.geocode(&address))
                        .catch_unwind()
                        .await
                        .map_err(panic_message);
                    (index, outcome)
                }
                .instrument(debug_span!("geocode", index)),
            );
        }

        let state = DispatchState {
            outstanding: (0..addresses.len()).collect(),
            addresses,
            mode,
            tasks,
            ready: BTreeMap::new(),
            next_index: 0,
        };

        stream::unfold(state, |mut state| async move {
            let location = state.next_location().await?;
            Some((location, state))
        })
        .boxed()
    }
}

impl std::fmt::Debug for BatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDispatcher").finish_non_exhaustive()
    }
}

/// In-flight tasks plus the reorder buffer
struct DispatchState {
    addresses: Vec<String>,
    mode: DeliveryMode,
    tasks: JoinSet<TaskOutcome>,
    /// Slots that have not produced a location yet
    outstanding: BTreeSet<usize>,
    /// Finished locations not yet released, by slot
    ready: BTreeMap<usize, GeocodedLocation>,
    /// Next slot to release in ordered mode
    next_index: usize,
}

impl DispatchState {
    async fn next_location(&mut self) -> Option<GeocodedLocation> {
        loop {
            if let Some(location) = self.take_ready() {
                return Some(location);
            }

            match self.tasks.join_next().await {
                Some(Ok((index, Ok(location)))) => self.complete(index, location),
                Some(Ok((index, Err(message)))) => {
                    error!(
                        index,
                        address = %self.addresses[index],
                        panic = %message,
                        "Geocode task panicked"
                    );
                    let sentinel = GeocodedLocation::null_island(self.addresses[index].as_str());
                    self.complete(index, sentinel);
                }
                Some(Err(e)) => {
                    error!(error = %e, "Geocode task did not complete");
                }
                None => {
                    if self.outstanding.is_empty() {
                        info!(count = self.addresses.len(), "Batch complete");
                        return None;
                    }
                    let missing: Vec<usize> = self.outstanding.iter().copied().collect();
                    for index in missing {
                        warn!(index, address = %self.addresses[index], "No result for address");
                        let sentinel = GeocodedLocation::null_island(self.addresses[index].as_str());
                        self.complete(index, sentinel);
                    }
                }
            }
        }
    }

    fn complete(&mut self, index: usize, location: GeocodedLocation) {
        if self.outstanding.remove(&index) {
            self.ready.insert(index, location);
        }
    }

    fn take_ready(&mut self) -> Option<GeocodedLocation> {
        match self.mode {
            DeliveryMode::Ordered => {
                let location = self.ready.remove(&self.next_index)?;
                self.next_index += 1;
                Some(location)
            }
            DeliveryMode::Completion => self.ready.pop_first().map(|(_, location)| location),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
