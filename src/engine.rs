//! Position acquisition engine.
//!
//! Wraps the device provider's one-shot fetch and continuous watch behind a
//! uniform async surface: a single `Result<Coordinate, _>` for one-shot
//! requests, and a callback-driven watch with an explicit handle for
//! continuous delivery. The gate runs before every one-shot request; its
//! failures map onto the engine's error taxonomy.

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::LocationError;
use crate::gate::PermissionGate;
use crate::provider::{FixError, FixRequest, PositionProvider, WatchId};
use crate::types::Coordinate;

/// Options for a one-shot acquisition. Defaults mirror the low-accuracy
/// profile used for map centering: 30s window, 10s cache tolerance.
#[derive(Debug, Clone, Copy)]
pub struct AcquireOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub max_cache_age: Duration,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            high_accuracy: false,
            timeout: Duration::from_secs(30),
            max_cache_age: Duration::from_secs(10),
        }
    }
}

/// An active continuous-position subscription.
///
/// Exactly one live handle may exist per logical consumer. The handle must be
/// released through [`AcquisitionEngine::stop_watch`]; dropping it without
/// stopping leaves the provider subscription delivering into a dead channel.
#[derive(Debug)]
pub struct WatchHandle {
    id: WatchId,
    forwarder: JoinHandle<()>,
    released: bool,
}

pub struct AcquisitionEngine {
    provider: Arc<dyn PositionProvider>,
    gate: PermissionGate,
}

impl AcquisitionEngine {
    pub fn new(provider: Arc<dyn PositionProvider>, gate: PermissionGate) -> Self {
        Self { provider, gate }
    }

    /// Acquire a single fix: permission prompt, service probe, then the
    /// provider request bounded by `options.timeout`.
    pub async fn current_position(
        &self,
        options: AcquireOptions,
    ) -> Result<Coordinate, LocationError> {
        if !self.gate.request_permission().await {
            return Err(LocationError::PermissionDenied);
        }
        if !self.gate.is_service_enabled().await? {
            self.gate.prompt_enable_service();
            return Err(LocationError::ServiceUnavailable);
        }

        let request = FixRequest {
            high_accuracy: options.high_accuracy,
            max_cache_age: options.max_cache_age,
        };
        match timeout(options.timeout, self.provider.position_fix(request)).await {
            Ok(Ok(coordinate)) => {
                debug!("acquired position {coordinate}");
                Ok(coordinate)
            }
            Ok(Err(FixError::ServicesDisabled)) => Err(LocationError::ServiceUnavailable),
            Ok(Err(FixError::Unavailable(reason))) => {
                Err(LocationError::PositionUnavailable(reason))
            }
            Err(_) => Err(LocationError::Timeout),
        }
    }

    /// Begin continuous delivery. Each provider update is handed to
    /// `on_update` in arrival order; no deduplication or smoothing.
    pub fn start_watch<F>(&self, on_update: F) -> WatchHandle
    where
        F: Fn(Coordinate) + Send + Sync + 'static,
    {
        let (id, mut updates) = self.provider.watch_position();
        debug!("watch {id} started");
        let forwarder = tokio::spawn(async move {
            while let Some(coordinate) = updates.recv().await {
                on_update(coordinate);
            }
        });
        WatchHandle {
            id,
            forwarder,
            released: false,
        }
    }

    /// Release a watch. Safe to call with a handle whose provider
    /// subscription has already been cleared.
    pub fn stop_watch(&self, mut handle: WatchHandle) {
        debug!("watch {} stopped", handle.id);
        self.provider.clear_watch(handle.id);
        handle.forwarder.abort();
        handle.released = true;
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "watch {} dropped without stop_watch; aborting forwarder",
                self.id
            );
            self.forwarder.abort();
        }
    }
}
