//! Interactive dual-marker point selection.
//!
//! A [`PickerSession`] is the logic behind a map-picker screen: it tracks
//! which marker (start or end) currently has focus, drives the acquisition
//! engine's watch mode on and off for live tracking, funnels manual edits and
//! search selections into the shared store, and hands the final pair back to
//! the caller from `confirm`. The caller awaits the confirmed pair directly;
//! there is no callback registry between the picker and its caller.
//!
//! Write ordering is last-write-wins per marker field: a manual edit racing a
//! live-watch delivery is settled by whichever reaches the store second.

use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::{AcquireOptions, AcquisitionEngine, WatchHandle};
use crate::error::LocationError;
use crate::places::{PlaceSearch, Suggestion};
use crate::store::LocationStore;
use crate::types::{Coordinate, Focus, MarkerPair};

/// Map span around a centered coordinate.
const DEFAULT_SPAN: f64 = 0.01;

/// Displayed map region: a center plus latitude/longitude spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub center: Coordinate,
    pub lat_span: f64,
    pub lon_span: f64,
}

impl Region {
    pub fn around(center: Coordinate) -> Self {
        Self {
            center,
            lat_span: DEFAULT_SPAN,
            lon_span: DEFAULT_SPAN,
        }
    }
}

/// Tuning for a picker session.
#[derive(Debug, Clone, Copy)]
pub struct PickerOptions {
    pub acquire: AcquireOptions,
    /// Trailing-edge debounce window for suggestion queries.
    pub search_debounce: Duration,
    /// Queries shorter than this never reach the suggestion provider.
    pub min_query_len: usize,
    pub suggestion_limit: usize,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            acquire: AcquireOptions::default(),
            search_debounce: Duration::from_millis(200),
            min_query_len: 3,
            suggestion_limit: 5,
        }
    }
}

pub struct PickerSession {
    store: Arc<LocationStore>,
    engine: Arc<AcquisitionEngine>,
    places: Arc<dyn PlaceSearch>,
    options: PickerOptions,
    focus: Focus,
    live_tracking: bool,
    watch: Option<WatchHandle>,
    region: Option<Region>,
    /// The map's "you are here" indicator, fed by live-watch deliveries.
    current_fix: Arc<Mutex<Option<Coordinate>>>,
    suggestions: Arc<Mutex<Vec<Suggestion>>>,
    /// Bumped on every query; debounce tasks and in-flight responses check
    /// it to drop superseded work.
    search_generation: Arc<AtomicU64>,
}

impl PickerSession {
    /// Open a picker seeded with the caller's initial markers and attempt a
    /// one-shot fetch to center the map. The fetch failing is non-fatal: the
    /// map simply keeps its default region.
    pub async fn open(
        store: Arc<LocationStore>,
        engine: Arc<AcquisitionEngine>,
        places: Arc<dyn PlaceSearch>,
        options: PickerOptions,
        initial: MarkerPair,
    ) -> Self {
        store.set_marker(Focus::Start, initial.start);
        store.set_marker(Focus::End, initial.end);

        let region = match engine.current_position(options.acquire).await {
            Ok(coordinate) => Some(Region::around(coordinate)),
            Err(e) => {
                warn!("could not center map on current location: {e}");
                None
            }
        };

        Self {
            store,
            engine,
            places,
            options,
            focus: Focus::Start,
            live_tracking: false,
            watch: None,
            region,
            current_fix: Arc::new(Mutex::new(None)),
            suggestions: Arc::new(Mutex::new(Vec::new())),
            search_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn live_tracking(&self) -> bool {
        self.live_tracking
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Last live-delivered device position, for the map's current-location
    /// indicator.
    pub fn current_fix(&self) -> Option<Coordinate> {
        *self.current_fix.lock().unwrap()
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.suggestions.lock().unwrap().clone()
    }

    /// Switch which marker receives subsequent updates. While live tracking
    /// is on, the watch is restarted so deliveries write to the new focus
    /// instead of the old one.
    pub fn set_focus(&mut self, focus: Focus) {
        if self.focus == focus {
            return;
        }
        self.focus = focus;
        if self.live_tracking {
            self.start_tracking();
        }
    }

    /// Turn continuous tracking on or off. Turning it off leaves the marker
    /// at its last delivered value.
    pub fn set_live_tracking(&mut self, enabled: bool) {
        if enabled == self.live_tracking {
            return;
        }
        self.live_tracking = enabled;
        if enabled {
            self.start_tracking();
        } else {
            self.stop_tracking();
        }
    }

    /// Drop or drag the focused marker by hand. Manual edits always land,
    /// but while live tracking is on the next watch delivery will overwrite
    /// them (documented last-write-wins).
    pub fn place_marker(&self, coordinate: Coordinate) {
        self.store.set_marker(self.focus, Some(coordinate));
    }

    /// Apply a chosen suggestion: set the focused marker and re-center the
    /// map on it.
    pub fn select_suggestion(&mut self, suggestion: &Suggestion) {
        self.store
            .set_marker(self.focus, Some(suggestion.coordinate));
        self.region = Some(Region::around(suggestion.coordinate));
    }

    /// Clear both markers. Focus and tracking state are untouched.
    pub fn reset(&self) {
        self.store.reset_markers();
    }

    /// Debounced suggestion lookup: trailing-edge, so a burst of queries
    /// inside the window produces at most one request, for the final query.
    /// Queries below the minimum length clear the list and also supersede
    /// any in-flight lookup. Lookup failures degrade to an empty list; they
    /// are never surfaced as blocking errors.
    pub fn queue_search(&self, query: &str) {
        let generation = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;
        if query.chars().count() < self.options.min_query_len {
            self.suggestions.lock().unwrap().clear();
            return;
        }

        let query = query.to_string();
        let places = self.places.clone();
        let suggestions = self.suggestions.clone();
        let current = self.search_generation.clone();
        let debounce = self.options.search_debounce;
        let limit = self.options.suggestion_limit;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if current.load(Ordering::SeqCst) != generation {
                // Superseded before the window closed.
                return;
            }
            let result = places.search(&query, limit).await;
            if current.load(Ordering::SeqCst) != generation {
                // A newer query landed while this one was in flight; its
                // results win regardless of arrival order.
                return;
            }
            match result {
                Ok(list) => *suggestions.lock().unwrap() = list,
                Err(e) => {
                    debug!("suggestion lookup for {query:?} failed: {e}");
                    suggestions.lock().unwrap().clear();
                }
            }
        });
    }

    /// Validate and return the selection. Fails with `SelectionRequired`
    /// when neither marker is set; on success the watch is released and the
    /// session is over.
    pub fn confirm(&mut self) -> Result<MarkerPair, LocationError> {
        let markers = self.store.markers();
        if markers.is_empty() {
            return Err(LocationError::SelectionRequired);
        }
        self.live_tracking = false;
        self.stop_tracking();
        debug!("selection confirmed: {markers:?}");
        Ok(markers)
    }

    /// Abandon the selection, releasing the watch.
    pub fn cancel(&mut self) {
        self.live_tracking = false;
        self.stop_tracking();
    }

    /// (Re)start the watch for the current focus. Any existing handle is
    /// stopped first: at most one watch is live per session.
    fn start_tracking(&mut self) {
        self.stop_tracking();

        let store = self.store.clone();
        let focus = self.focus;
        let current_fix = self.current_fix.clone();
        let handle = self.engine.start_watch(move |coordinate| {
            *current_fix.lock().unwrap() = Some(coordinate);
            store.set_marker(focus, Some(coordinate));
        });
        self.watch = Some(handle);
    }

    fn stop_tracking(&mut self) {
        if let Some(handle) = self.watch.take() {
            self.engine.stop_watch(handle);
        }
    }
}

impl Drop for PickerSession {
    fn drop(&mut self) {
        // Screen teardown without confirm/cancel must still release the
        // watch, or the provider keeps delivering to a dead consumer.
        self.stop_tracking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::PermissionGate;
    use crate::provider::{PositionProvider, SimulatedProvider};
    use crate::types::ResolvedAddress;
    use futures::future::BoxFuture;

    struct FixedGeocoder;

    impl crate::geocode::Geocoder for FixedGeocoder {
        fn resolve_address(
            &self,
            _coordinate: Coordinate,
        ) -> BoxFuture<'_, Result<ResolvedAddress, LocationError>> {
            Box::pin(async { Ok(ResolvedAddress::default()) })
        }
    }

    /// Place-search stub recording every query it actually receives.
    struct RecordingPlaces {
        queries: Mutex<Vec<String>>,
        results: Vec<Suggestion>,
    }

    impl RecordingPlaces {
        fn new(results: Vec<Suggestion>) -> Arc<Self> {
            Arc::new(Self {
                queries: Mutex::new(Vec::new()),
                results,
            })
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl PlaceSearch for RecordingPlaces {
        fn search(
            &self,
            query: &str,
            _limit: usize,
        ) -> BoxFuture<'_, Result<Vec<Suggestion>, LocationError>> {
            self.queries.lock().unwrap().push(query.to_string());
            let results = self.results.clone();
            Box::pin(async move { Ok(results) })
        }
    }

    struct Fixture {
        provider: Arc<SimulatedProvider>,
        store: Arc<LocationStore>,
        engine: Arc<AcquisitionEngine>,
        places: Arc<RecordingPlaces>,
    }

    fn fixture() -> Fixture {
        let provider = Arc::new(SimulatedProvider::new());
        let dyn_provider: Arc<dyn PositionProvider> = provider.clone();
        let engine = Arc::new(AcquisitionEngine::new(
            dyn_provider.clone(),
            PermissionGate::new(dyn_provider),
        ));
        let store = LocationStore::new(engine.clone(), Arc::new(FixedGeocoder));
        let places = RecordingPlaces::new(vec![Suggestion {
            label: "Delhi, India".to_string(),
            coordinate: Coordinate::new(28.6139, 77.2088),
        }]);
        Fixture {
            provider,
            store,
            engine,
            places,
        }
    }

    async fn open_session(f: &Fixture, initial: MarkerPair) -> PickerSession {
        // Two scripted fixes: service probe + centering fetch.
        f.provider.push_fix(Coordinate::new(10.0, 10.0));
        f.provider.push_fix(Coordinate::new(10.0, 10.0));
        PickerSession::open(
            f.store.clone(),
            f.engine.clone(),
            f.places.clone(),
            PickerOptions::default(),
            initial,
        )
        .await
    }

    async fn drain_tasks() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_open_seeds_markers_and_centers_map() {
        let f = fixture();
        let initial = MarkerPair {
            start: Some(Coordinate::new(1.0, 1.0)),
            end: None,
        };
        let session = open_session(&f, initial).await;

        assert_eq!(session.focus(), Focus::Start);
        assert!(!session.live_tracking());
        assert_eq!(f.store.markers(), initial);
        assert_eq!(
            session.region(),
            Some(Region::around(Coordinate::new(10.0, 10.0)))
        );
    }

    #[tokio::test]
    async fn test_open_survives_centering_failure() {
        let f = fixture();
        f.provider.deny_permission();
        let session = PickerSession::open(
            f.store.clone(),
            f.engine.clone(),
            f.places.clone(),
            PickerOptions::default(),
            MarkerPair::default(),
        )
        .await;
        assert_eq!(session.region(), None);
    }

    #[tokio::test]
    async fn test_live_tracking_writes_focused_marker_in_order() {
        let f = fixture();
        let before_end = Some(Coordinate::new(50.0, 50.0));
        let mut session = open_session(
            &f,
            MarkerPair {
                start: None,
                end: before_end,
            },
        )
        .await;

        session.set_live_tracking(true);
        f.provider.emit(Coordinate::new(1.0, 1.0));
        f.provider.emit(Coordinate::new(2.0, 2.0));
        f.provider.emit(Coordinate::new(3.0, 3.0));
        drain_tasks().await;

        let markers = f.store.markers();
        assert_eq!(markers.start, Some(Coordinate::new(3.0, 3.0)));
        assert_eq!(markers.end, before_end);
        assert_eq!(session.current_fix(), Some(Coordinate::new(3.0, 3.0)));
    }

    #[tokio::test]
    async fn test_focus_change_restarts_watch_stop_before_start() {
        let f = fixture();
        let mut session = open_session(&f, MarkerPair::default()).await;

        session.set_live_tracking(true);
        assert_eq!(f.provider.watch_starts(), 1);
        assert_eq!(f.provider.active_watch_count(), 1);

        session.set_focus(Focus::End);
        // Old handle released before the replacement was created.
        assert_eq!(f.provider.watch_clears(), 1);
        assert_eq!(f.provider.watch_starts(), 2);
        assert_eq!(f.provider.active_watch_count(), 1);

        f.provider.emit(Coordinate::new(7.0, 7.0));
        drain_tasks().await;
        assert_eq!(f.store.markers().end, Some(Coordinate::new(7.0, 7.0)));
        assert_eq!(f.store.markers().start, None);
    }

    #[tokio::test]
    async fn test_toggle_off_then_on_keeps_single_watch() {
        let f = fixture();
        let mut session = open_session(&f, MarkerPair::default()).await;

        session.set_live_tracking(true);
        session.set_live_tracking(false);
        assert_eq!(f.provider.active_watch_count(), 0);

        session.set_live_tracking(true);
        assert_eq!(f.provider.active_watch_count(), 1);
        assert_eq!(f.provider.watch_starts(), 2);
        assert_eq!(f.provider.watch_clears(), 1);
    }

    #[tokio::test]
    async fn test_tracking_off_keeps_last_delivered_marker() {
        let f = fixture();
        let mut session = open_session(&f, MarkerPair::default()).await;

        session.set_live_tracking(true);
        f.provider.emit(Coordinate::new(4.0, 4.0));
        drain_tasks().await;
        session.set_live_tracking(false);

        assert_eq!(f.store.markers().start, Some(Coordinate::new(4.0, 4.0)));
    }

    #[tokio::test]
    async fn test_manual_edit_lands_even_while_tracking() {
        let f = fixture();
        let mut session = open_session(&f, MarkerPair::default()).await;

        session.set_live_tracking(true);
        session.place_marker(Coordinate::new(5.0, 5.0));
        assert_eq!(f.store.markers().start, Some(Coordinate::new(5.0, 5.0)));

        // The next delivery overwrites it: documented last-write-wins.
        f.provider.emit(Coordinate::new(6.0, 6.0));
        drain_tasks().await;
        assert_eq!(f.store.markers().start, Some(Coordinate::new(6.0, 6.0)));
    }

    #[tokio::test]
    async fn test_suggestion_selection_sets_marker_and_recenter() {
        let f = fixture();
        let mut session = open_session(&f, MarkerPair::default()).await;
        session.set_focus(Focus::End);

        let suggestion = Suggestion {
            label: "Delhi, India".to_string(),
            coordinate: Coordinate::new(28.6139, 77.2088),
        };
        session.select_suggestion(&suggestion);

        assert_eq!(f.store.markers().end, Some(suggestion.coordinate));
        assert_eq!(session.region(), Some(Region::around(suggestion.coordinate)));
    }

    #[tokio::test]
    async fn test_reset_clears_markers_but_not_mode() {
        let f = fixture();
        let mut session = open_session(
            &f,
            MarkerPair {
                start: Some(Coordinate::new(1.0, 1.0)),
                end: Some(Coordinate::new(2.0, 2.0)),
            },
        )
        .await;
        session.set_focus(Focus::End);
        session.set_live_tracking(true);

        session.reset();

        assert_eq!(f.store.markers(), MarkerPair::default());
        assert_eq!(session.focus(), Focus::End);
        assert!(session.live_tracking());
        session.cancel();
    }

    #[tokio::test]
    async fn test_confirm_requires_a_selection() {
        let f = fixture();
        let mut session = open_session(&f, MarkerPair::default()).await;

        let result = session.confirm();
        assert!(matches!(result, Err(LocationError::SelectionRequired)));

        session.place_marker(Coordinate::new(1.0, 1.0));
        let pair = session.confirm().unwrap();
        assert_eq!(pair.start, Some(Coordinate::new(1.0, 1.0)));
        assert_eq!(pair.end, None);
    }

    #[tokio::test]
    async fn test_confirm_releases_the_watch() {
        let f = fixture();
        let mut session = open_session(&f, MarkerPair::default()).await;
        session.set_live_tracking(true);
        session.place_marker(Coordinate::new(1.0, 1.0));

        session.confirm().unwrap();
        assert_eq!(f.provider.active_watch_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_the_watch() {
        let f = fixture();
        let mut session = open_session(&f, MarkerPair::default()).await;
        session.set_live_tracking(true);
        assert_eq!(f.provider.active_watch_count(), 1);

        drop(session);
        assert_eq!(f.provider.active_watch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_debounce_sends_only_the_final_query() {
        let f = fixture();
        let session = open_session(&f, MarkerPair::default()).await;

        session.queue_search("De");
        session.queue_search("Del");
        session.queue_search("Delh");

        // Let the debounce window elapse and the winning task run.
        tokio::time::sleep(Duration::from_millis(500)).await;
        drain_tasks().await;

        assert_eq!(f.places.queries(), vec!["Delh".to_string()]);
        assert_eq!(session.suggestions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_queries_clear_suggestions_without_a_request() {
        let f = fixture();
        let session = open_session(&f, MarkerPair::default()).await;

        session.queue_search("Delhi");
        tokio::time::sleep(Duration::from_millis(500)).await;
        drain_tasks().await;
        assert_eq!(session.suggestions().len(), 1);

        session.queue_search("De");
        tokio::time::sleep(Duration::from_millis(500)).await;
        drain_tasks().await;

        assert!(session.suggestions().is_empty());
        assert_eq!(f.places.queries(), vec!["Delhi".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_cannot_overwrite_newer_query() {
        let f = fixture();
        let session = open_session(&f, MarkerPair::default()).await;

        session.queue_search("Delhi");
        // Supersede before the window closes, then clear with a short query.
        session.queue_search("Mumbai");
        session.queue_search("X");

        tokio::time::sleep(Duration::from_millis(500)).await;
        drain_tasks().await;

        // Neither debounce task survived its generation check.
        assert!(f.places.queries().is_empty());
        assert!(session.suggestions().is_empty());
    }
}
