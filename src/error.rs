//! Error taxonomy for the location service.
//!
//! Permission and service failures are terminal for the current acquisition
//! attempt: callers surface the message and stop, they do not retry silently.
//! Suggestion-search failures are best-effort and degrade to an empty list at
//! the picker layer instead of being raised to the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationError {
    /// The user declined the fine-location permission prompt.
    #[error("location permission was denied")]
    PermissionDenied,

    /// Location services are switched off on the device.
    #[error("location services are disabled")]
    ServiceUnavailable,

    /// No position fix arrived within the configured window.
    #[error("timed out waiting for a position fix")]
    Timeout,

    /// The provider failed for a reason other than permission or
    /// service availability.
    #[error("could not determine the current position: {0}")]
    PositionUnavailable(String),

    /// The geocoding provider returned zero results, or a result without
    /// address components, for the coordinate.
    #[error("no address found for the given coordinate")]
    NoAddressFound,

    /// Network or backend failure from a geocoding/suggestion provider.
    /// Not retried internally.
    #[error("provider request failed: {0}")]
    ProviderError(String),

    /// Confirm was invoked with neither marker set.
    #[error("select at least one location before confirming")]
    SelectionRequired,

    /// A required API key or setting is missing. Detected eagerly at
    /// construction, not deep inside the first network call.
    #[error("missing configuration: {0}")]
    ConfigurationError(String),
}
