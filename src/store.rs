//! Shared location state store.
//!
//! One [`LocationStore`] exists per session; every consuming screen reads and
//! writes the same instance, so there are no per-screen copies to drift. All
//! mutation flows through this surface (`set_marker`, `reset_markers`,
//! `refresh_current_location`); fan-out to observers rides a
//! `tokio::sync::watch` channel, and each mutation publishes the full state
//! under the channel's internal lock, so a subscriber can never observe a
//! half-applied reset.

use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::watch;

use crate::engine::{AcquireOptions, AcquisitionEngine};
use crate::error::LocationError;
use crate::geocode::Geocoder;
use crate::types::{Coordinate, Focus, LocationSnapshot, MarkerPair};

/// Full observable state, published as a unit on every mutation.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub snapshot: Option<LocationSnapshot>,
    pub markers: MarkerPair,
}

pub struct LocationStore {
    state: watch::Sender<StoreState>,
    engine: Arc<AcquisitionEngine>,
    geocoder: Arc<dyn Geocoder>,
}

impl LocationStore {
    pub fn new(engine: Arc<AcquisitionEngine>, geocoder: Arc<dyn Geocoder>) -> Arc<Self> {
        let (state, _) = watch::channel(StoreState::default());
        Arc::new(Self {
            state,
            engine,
            geocoder,
        })
    }

    /// Observe every subsequent state change. The receiver starts at the
    /// current state.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    /// Last known resolved location, if any acquisition has succeeded yet.
    pub fn snapshot(&self) -> Option<LocationSnapshot> {
        self.state.borrow().snapshot.clone()
    }

    pub fn markers(&self) -> MarkerPair {
        self.state.borrow().markers
    }

    /// Replace exactly one marker field. Last write wins; there is no
    /// timestamp reconciliation between racing writers.
    pub fn set_marker(&self, which: Focus, coordinate: Option<Coordinate>) {
        self.state.send_modify(|state| {
            state.markers.set(which, coordinate);
        });
    }

    /// Clear both markers in one published change.
    pub fn reset_markers(&self) {
        self.state.send_modify(|state| {
            state.markers = MarkerPair::default();
        });
    }

    /// Run the full gate → acquisition → geocode cycle and store the result.
    ///
    /// Any stage failure surfaces to the caller and leaves the previous
    /// snapshot untouched: a transient failure never clears known-good state.
    pub async fn refresh_current_location(
        &self,
        options: AcquireOptions,
    ) -> Result<LocationSnapshot, LocationError> {
        let coordinate = self.engine.current_position(options).await.map_err(|e| {
            warn!("location refresh failed during acquisition: {e}");
            e
        })?;
        let address = self.geocoder.resolve_address(coordinate).await.map_err(|e| {
            warn!("location refresh failed during geocoding: {e}");
            e
        })?;

        let snapshot = LocationSnapshot {
            coordinate,
            address,
            resolved_at: Utc::now(),
        };
        debug!("storing snapshot for {coordinate}");
        self.state.send_modify(|state| {
            state.snapshot = Some(snapshot.clone());
        });
        Ok(snapshot)
    }
}
