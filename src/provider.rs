//! Device location provider seam.
//!
//! The OS location API (permission prompt, one-shot fix, continuous watch) is
//! an opaque collaborator behind the [`PositionProvider`] trait. The
//! [`SimulatedProvider`] drives tests and the diagnostic CLI with scripted
//! fixes, and doubles as the reference for the counters the picker tests
//! assert on (watch starts/clears).

use futures::future::BoxFuture;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::types::Coordinate;

/// Opaque identifier for an active continuous-position subscription.
pub type WatchId = u64;

/// Provider-side failure for a one-shot fix. Timeouts are enforced by the
/// acquisition engine, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixError {
    /// The platform reported that location services are switched off.
    ServicesDisabled,
    /// Any other provider-side failure.
    Unavailable(String),
}

impl fmt::Display for FixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixError::ServicesDisabled => write!(f, "location services disabled"),
            FixError::Unavailable(reason) => write!(f, "position unavailable: {reason}"),
        }
    }
}

/// Options forwarded to the platform for a one-shot fix.
#[derive(Debug, Clone, Copy)]
pub struct FixRequest {
    pub high_accuracy: bool,
    /// Maximum acceptable age of a cached fix.
    pub max_cache_age: Duration,
}

/// Platform location API: permission prompt, one-shot fix, watch lifecycle.
///
/// Watch updates are delivered in provider order on the returned channel; no
/// deduplication or smoothing is applied. `clear_watch` on an unknown or
/// already-cleared id is a no-op, never an error.
pub trait PositionProvider: Send + Sync {
    /// Issue the platform permission prompt once. Platform errors collapse
    /// to `false`; this never fails.
    fn request_permission(&self) -> BoxFuture<'_, bool>;

    /// Request a single fresh (or acceptably cached) fix.
    fn position_fix(&self, request: FixRequest) -> BoxFuture<'_, Result<Coordinate, FixError>>;

    /// Begin continuous delivery. The subscription stays live until
    /// `clear_watch` is called with the returned id.
    fn watch_position(&self) -> (WatchId, mpsc::UnboundedReceiver<Coordinate>);

    /// Release a subscription. Idempotent.
    fn clear_watch(&self, id: WatchId);
}

#[derive(Default)]
struct SimState {
    permission_granted: bool,
    services_enabled: bool,
    hold_fixes: bool,
    fixes: VecDeque<Coordinate>,
    last_fix: Option<Coordinate>,
    next_watch_id: WatchId,
    watches: HashMap<WatchId, mpsc::UnboundedSender<Coordinate>>,
    permission_requests: u64,
    fix_requests: u64,
    watch_starts: u64,
    watch_clears: u64,
}

/// Scripted in-process provider for tests and the diagnostic CLI.
///
/// One-shot fixes are popped from a queue (the last fix repeats once the
/// queue drains); `emit` fans a coordinate out to every active watch.
pub struct SimulatedProvider {
    state: Mutex<SimState>,
}

impl SimulatedProvider {
    /// Provider with permission granted, services enabled, and no fixes
    /// scripted yet.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                permission_granted: true,
                services_enabled: true,
                ..Default::default()
            }),
        }
    }

    /// Script the next one-shot fix. Fixes are consumed in push order.
    pub fn push_fix(&self, coordinate: Coordinate) {
        let mut state = self.state.lock().unwrap();
        state.fixes.push_back(coordinate);
    }

    /// Make one-shot requests hang once the scripted queue is drained,
    /// until the caller's timeout fires.
    pub fn hold_fixes(&self) {
        self.state.lock().unwrap().hold_fixes = true;
    }

    pub fn deny_permission(&self) {
        self.state.lock().unwrap().permission_granted = false;
    }

    pub fn disable_services(&self) {
        self.state.lock().unwrap().services_enabled = false;
    }

    /// Deliver a coordinate to every active watch, in subscription order.
    pub fn emit(&self, coordinate: Coordinate) {
        let state = self.state.lock().unwrap();
        for sender in state.watches.values() {
            // A closed receiver just means the consumer is gone.
            let _ = sender.send(coordinate);
        }
    }

    pub fn active_watch_count(&self) -> usize {
        self.state.lock().unwrap().watches.len()
    }

    pub fn watch_starts(&self) -> u64 {
        self.state.lock().unwrap().watch_starts
    }

    pub fn watch_clears(&self) -> u64 {
        self.state.lock().unwrap().watch_clears
    }

    pub fn permission_requests(&self) -> u64 {
        self.state.lock().unwrap().permission_requests
    }

    pub fn fix_requests(&self) -> u64 {
        self.state.lock().unwrap().fix_requests
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionProvider for SimulatedProvider {
    fn request_permission(&self) -> BoxFuture<'_, bool> {
        Box::pin(async {
            let mut state = self.state.lock().unwrap();
            state.permission_requests += 1;
            state.permission_granted
        })
    }

    fn position_fix(&self, request: FixRequest) -> BoxFuture<'_, Result<Coordinate, FixError>> {
        Box::pin(async move {
            {
                let mut state = self.state.lock().unwrap();
                state.fix_requests += 1;
                debug!(
                    "simulated fix request (high_accuracy={}, max_cache_age={:?})",
                    request.high_accuracy, request.max_cache_age
                );
                if !state.services_enabled {
                    return Err(FixError::ServicesDisabled);
                }
                if let Some(coordinate) = state.fixes.pop_front() {
                    state.last_fix = Some(coordinate);
                    return Ok(coordinate);
                }
                if !state.hold_fixes {
                    return match state.last_fix {
                        Some(coordinate) => Ok(coordinate),
                        None => Err(FixError::Unavailable("no fix scripted".to_string())),
                    };
                }
            }
            // Queue drained and holds requested: never resolves, the
            // caller's timeout cancels us.
            futures::future::pending().await
        })
    }

    fn watch_position(&self) -> (WatchId, mpsc::UnboundedReceiver<Coordinate>) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_watch_id;
        state.next_watch_id += 1;
        state.watch_starts += 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        state.watches.insert(id, sender);
        (id, receiver)
    }

    fn clear_watch(&self, id: WatchId) {
        let mut state = self.state.lock().unwrap();
        if state.watches.remove(&id).is_some() {
            state.watch_clears += 1;
        }
    }
}
