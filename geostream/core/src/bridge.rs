//! Sync-over-Async Bridge
//!
//! Exposes a batch as a plain blocking [`Iterator`] for callers that have no
//! async runtime of their own. Two strategies are available:
//!
//! ```text
//! Thread (default)
//!   caller thread                      worker thread "geostream-bridge"
//!   ─────────────                      ───────────────────────────────
//!   next() ── blocking_recv ◄── mpsc ◄── Item(loc) ... Item(loc), Done
//!                              (bounded)   │
//!                                          └─ current-thread runtime
//!                                             driving BatchDispatcher
//!
//! Pump
//!   caller thread
//!   ─────────────
//!   next() ── runtime.block_on(stream.next())   one step per call
//! ```
//!
//! Both strategies make the first result visible as soon as it exists, mark
//! the end of a batch unambiguously, and end cleanly after an internal
//! fault instead of hanging the caller.
//!
//! Neither may be driven from inside an async context: `blocking_recv` and
//! `block_on` both refuse to run on a runtime thread.

use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::thread::JoinHandle;

use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::dispatch::{BatchDispatcher, DeliveryMode};
use crate::location::GeocodedLocation;

/// Name of the thread bridge's worker thread
const WORKER_THREAD_NAME: &str = "geostream-bridge";

/// How a batch is exposed to synchronous callers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStrategy {
    /// Worker thread feeding a bounded channel
    #[default]
    Thread,
    /// Caller-driven runtime, one step per `next()`
    Pump,
}

impl BridgeStrategy {
    /// Lowercase name, as used in config files and logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::Pump => "pump",
        }
    }
}

impl std::fmt::Display for BridgeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BridgeStrategy {
    type Err = UnknownBridgeStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thread" => Ok(Self::Thread),
            "pump" => Ok(Self::Pump),
            _ => Err(UnknownBridgeStrategy(s.to_string())),
        }
    }
}

/// A bridge strategy name that is neither `thread` nor `pump`
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown bridge strategy '{0}' (expected 'thread' or 'pump')")]
pub struct UnknownBridgeStrategy(pub String);

/// Failures while starting a bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The Tokio runtime could not be built
    #[error("could not build async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The worker thread could not be spawned
    #[error("could not spawn bridge worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Message sent from the worker thread to the consumer
#[derive(Debug)]
pub enum BridgeMessage {
    /// One geocoded location
    Item(GeocodedLocation),
    /// The batch is complete; nothing follows
    Done,
}

fn current_thread_runtime() -> Result<Runtime, BridgeError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(BridgeError::Runtime)
}

// ============================================================================
// Thread + bounded channel
// ============================================================================

/// Blocking iterator fed by a dedicated worker thread
#[derive(Debug)]
pub struct ThreadBridge {
    receiver: mpsc::Receiver<BridgeMessage>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl ThreadBridge {
    /// Start the worker thread and begin geocoding immediately.
    ///
    /// At most `channel_capacity` results are buffered ahead of the
    /// consumer; a capacity of zero is treated as one.
    pub fn spawn(
        dispatcher: BatchDispatcher,
        addresses: Vec<String>,
        mode: DeliveryMode,
        channel_capacity: usize,
    ) -> Result<Self, BridgeError> {
        let (sender, receiver) = mpsc::channel(channel_capacity.max(1));
        let runtime = current_thread_runtime()?;

        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(forward_batch(dispatcher, addresses, mode, sender));
            })
            .map_err(BridgeError::Spawn)?;

        Ok(Self {
            receiver,
            worker: Some(worker),
            finished: false,
        })
    }
}

/// Drive the dispatch stream and forward every result to the consumer
async fn forward_batch(
    dispatcher: BatchDispatcher,
    addresses: Vec<String>,
    mode: DeliveryMode,
    sender: mpsc::Sender<BridgeMessage>,
) {
    let mut stream = dispatcher.dispatch(addresses, mode);

    loop {
        let next = tokio::select! {
            next = stream.next() => next,
            () = sender.closed() => {
                debug!("Consumer dropped the iterator, stopping batch");
                return;
            }
        };

        let message = match next {
            Some(location) => BridgeMessage::Item(location),
            None => BridgeMessage::Done,
        };
        let done = matches!(message, BridgeMessage::Done);

        if sender.send(message).await.is_err() {
            debug!("Consumer dropped the iterator, stopping batch");
            return;
        }
        if done {
            return;
        }
    }
}

impl Iterator for ThreadBridge {
    type Item = GeocodedLocation;

    fn next(&mut self) -> Option<GeocodedLocation> {
        if self.finished {
            return None;
        }

        match self.receiver.blocking_recv() {
            Some(BridgeMessage::Item(location)) => Some(location),
            Some(BridgeMessage::Done) => {
                self.finished = true;
                None
            }
            None => {
                warn!("Bridge worker exited before the batch completed");
                self.finished = true;
                None
            }
        }
    }
}

impl Drop for ThreadBridge {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Bridge worker thread panicked");
            }
        }
    }
}

// ============================================================================
// Step-driven pump
// ============================================================================

/// Blocking iterator that drives its own runtime on the caller's thread
pub struct PumpBridge {
    // Declared before `runtime` so the stream (and its tasks) drop first
    stream: Option<BoxStream<'static, GeocodedLocation>>,
    runtime: Runtime,
}

impl PumpBridge {
    /// Build the runtime and queue the batch.
    ///
    /// Geocode tasks only make progress while `next()` is running.
    pub fn new(
        dispatcher: &BatchDispatcher,
        addresses: Vec<String>,
        mode: DeliveryMode,
    ) -> Result<Self, BridgeError> {
        let runtime = current_thread_runtime()?;
        let stream = {
            let _guard = runtime.enter();
            dispatcher.dispatch(addresses, mode)
        };

        Ok(Self {
            stream: Some(stream),
            runtime,
        })
    }
}

impl Iterator for PumpBridge {
    type Item = GeocodedLocation;

    fn next(&mut self) -> Option<GeocodedLocation> {
        let stream = self.stream.as_mut()?;
        let runtime = &self.runtime;

        match std::panic::catch_unwind(AssertUnwindSafe(|| runtime.block_on(stream.next()))) {
            Ok(Some(location)) => Some(location),
            Ok(None) => {
                self.stream = None;
                None
            }
            Err(_) => {
                error!("Batch step panicked, ending iteration");
                self.stream = None;
                None
            }
        }
    }
}

impl std::fmt::Debug for PumpBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PumpBridge")
            .field("finished", &self.stream.is_none())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Strategy-agnostic iterator
// ============================================================================

/// Blocking iterator over a batch's results
#[derive(Debug)]
pub enum GeocodeIter {
    /// Backed by a worker thread
    Thread(ThreadBridge),
    /// Backed by a caller-driven runtime
    Pump(PumpBridge),
}

impl GeocodeIter {
    /// Start a batch using `strategy`
    pub fn start(
        strategy: BridgeStrategy,
        dispatcher: BatchDispatcher,
        addresses: Vec<String>,
        mode: DeliveryMode,
        channel_capacity: usize,
    ) -> Result<Self, BridgeError> {
        match strategy {
            BridgeStrategy::Thread => Ok(Self::Thread(ThreadBridge::spawn(
                dispatcher,
                addresses,
                mode,
                channel_capacity,
            )?)),
            BridgeStrategy::Pump => Ok(Self::Pump(PumpBridge::new(&dispatcher, addresses, mode)?)),
        }
    }
}

impl Iterator for GeocodeIter {
    type Item = GeocodedLocation;

    fn next(&mut self) -> Option<GeocodedLocation> {
        match self {
            Self::Thread(bridge) => bridge.next(),
            Self::Pump(bridge) => bridge.next(),
        }
    }
}
