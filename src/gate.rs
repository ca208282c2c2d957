//! Permission and service-availability gate.
//!
//! Verifies two independent preconditions before any acquisition: the user
//! has granted fine-location permission, and the location service itself is
//! switched on. Both failures are terminal for the current attempt; the user
//! has to re-trigger acquisition explicitly after fixing them.

use futures::future::BoxFuture;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::LocationError;
use crate::provider::{FixError, FixRequest, PositionProvider};

/// Low-accuracy probe used only to find out whether the service is enabled.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_MAX_CACHE_AGE: Duration = Duration::from_secs(10);

/// Sink for the "enable location services" prompt. On a device this opens
/// the system settings screen; headless hosts log instead.
pub trait ServicePrompt: Send + Sync {
    fn prompt_enable(&self);
}

/// Default prompt sink: a warning in the log.
pub struct LogPrompt;

impl ServicePrompt for LogPrompt {
    fn prompt_enable(&self) {
        warn!("location services are disabled; enable GPS in system settings to continue");
    }
}

pub struct PermissionGate {
    provider: Arc<dyn PositionProvider>,
    prompt: Box<dyn ServicePrompt>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PositionProvider>) -> Self {
        Self::with_prompt(provider, Box::new(LogPrompt))
    }

    pub fn with_prompt(provider: Arc<dyn PositionProvider>, prompt: Box<dyn ServicePrompt>) -> Self {
        Self { provider, prompt }
    }

    /// Issue the platform permission prompt once. Never fails; platform
    /// errors collapse to `false` inside the provider.
    pub fn request_permission(&self) -> BoxFuture<'_, bool> {
        self.provider.request_permission()
    }

    /// Probe whether the location service is actually switched on.
    ///
    /// A "services disabled" provider error maps to `Ok(false)`. Any other
    /// failure is indeterminate and propagates; it is not coerced to `false`.
    pub async fn is_service_enabled(&self) -> Result<bool, LocationError> {
        let probe = FixRequest {
            high_accuracy: false,
            max_cache_age: PROBE_MAX_CACHE_AGE,
        };
        let outcome = timeout(PROBE_TIMEOUT, self.provider.position_fix(probe)).await;
        match outcome {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(FixError::ServicesDisabled)) => {
                debug!("service probe: provider reports services disabled");
                Ok(false)
            }
            Ok(Err(FixError::Unavailable(reason))) => {
                Err(LocationError::PositionUnavailable(reason))
            }
            Err(_) => Err(LocationError::PositionUnavailable(
                "service probe timed out".to_string(),
            )),
        }
    }

    /// Fire-and-forget: direct the user towards system settings. Does not
    /// block or retry.
    pub fn prompt_enable_service(&self) {
        self.prompt.prompt_enable();
    }
}
