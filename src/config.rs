use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::AcquireOptions;
use crate::error::LocationError;
use crate::picker::PickerOptions;

/// Environment variables that override the file-configured API keys.
pub const MAPS_API_KEY_VAR: &str = "WAYMARK_MAPS_API_KEY";
pub const PLACES_API_KEY_VAR: &str = "WAYMARK_PLACES_API_KEY";

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key for the geocoding and static-map endpoints.
    pub maps_api_key: Option<String>,
    /// Key for the place-suggestion endpoint.
    pub places_api_key: Option<String>,
    pub position_timeout_ms: u64,
    pub max_cache_age_ms: u64,
    pub high_accuracy: bool,
    pub search_debounce_ms: u64,
    pub min_query_len: usize,
    pub suggestion_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maps_api_key: None,
            places_api_key: None,
            position_timeout_ms: 30_000,
            max_cache_age_ms: 10_000,
            high_accuracy: false,
            search_debounce_ms: 200,
            min_query_len: 3,
            suggestion_limit: 5,
        }
    }
}

impl Config {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Load from YAML, then apply environment-variable key overrides.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Config = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.apply_env();

        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = env::var(MAPS_API_KEY_VAR) {
            self.maps_api_key = Some(key);
        }
        if let Ok(key) = env::var(PLACES_API_KEY_VAR) {
            self.places_api_key = Some(key);
        }
    }

    pub fn get_config_path(config_arg: &Option<PathBuf>) -> PathBuf {
        config_arg
            .clone()
            .unwrap_or_else(|| PathBuf::from("waymark.yaml"))
    }

    /// Both API keys must be present before any provider is constructed.
    /// Checked eagerly so a missing key fails here, not inside the first
    /// network call.
    pub fn validate(&self) -> Result<(), LocationError> {
        self.require_maps_key()?;
        self.require_places_key()?;
        Ok(())
    }

    pub fn require_maps_key(&self) -> Result<&str, LocationError> {
        self.maps_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                LocationError::ConfigurationError(format!(
                    "maps API key is not set (maps_api_key in the config file, or {MAPS_API_KEY_VAR})"
                ))
            })
    }

    pub fn require_places_key(&self) -> Result<&str, LocationError> {
        self.places_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                LocationError::ConfigurationError(format!(
                    "place-suggestion API key is not set (places_api_key in the config file, or {PLACES_API_KEY_VAR})"
                ))
            })
    }

    pub fn acquire_options(&self) -> AcquireOptions {
        AcquireOptions {
            high_accuracy: self.high_accuracy,
            timeout: Duration::from_millis(self.position_timeout_ms),
            max_cache_age: Duration::from_millis(self.max_cache_age_ms),
        }
    }

    pub fn picker_options(&self) -> PickerOptions {
        PickerOptions {
            acquire: self.acquire_options(),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            min_query_len: self.min_query_len,
            suggestion_limit: self.suggestion_limit,
        }
    }
}
