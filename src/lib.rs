//! # waymark
//!
//! A location coordination service: permission gating, one-shot and
//! continuous position acquisition, reverse geocoding, a shared reactive
//! location store, and the dual-marker point-selection protocol behind a
//! map-picker screen.
//!
//! ## Pieces
//!
//! - [`gate`] — location-permission prompt and service-enabled probe
//! - [`engine`] — one-shot fix with timeout, watch start/stop
//! - [`geocode`] — coordinate → structured address, with a defensive
//!   component-extraction policy
//! - [`places`] — free-text place suggestions for the picker search box
//! - [`store`] — the single shared marker/snapshot store all screens observe
//! - [`picker`] — the focus/live-tracking/confirm state machine
//! - [`route`] — static route-map URL export
//!
//! The device location API sits behind [`provider::PositionProvider`]; the
//! bundled [`provider::SimulatedProvider`] drives tests and the CLI.

// Export modules for integration testing
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod geocode;
pub mod picker;
pub mod places;
pub mod provider;
pub mod route;
pub mod store;
pub mod types;
