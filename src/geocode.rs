//! Reverse geocoding: coordinate in, structured address out.
//!
//! The provider response is the Google-style shape
//! `results[].address_components[]`, each component carrying a `long_name`
//! and a `types` array. Extraction is defensive and exhaustive: every
//! [`ResolvedAddress`] field falls back to an empty string when no component
//! matches, so a partially-typed response never fails the lookup.

use futures::future::BoxFuture;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::LocationError;
use crate::types::{Coordinate, ResolvedAddress};

const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Interface for reverse geocoding backends.
pub trait Geocoder: Send + Sync {
    /// Resolve a coordinate to a structured address.
    ///
    /// Fails with [`LocationError::NoAddressFound`] when the provider has
    /// zero results (or a result without address components), and with
    /// [`LocationError::ProviderError`] for network or backend failures.
    /// Not retried internally.
    fn resolve_address(
        &self,
        coordinate: Coordinate,
    ) -> BoxFuture<'_, Result<ResolvedAddress, LocationError>>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

/// First component carrying the given type, if any.
fn component<'a>(components: &'a [AddressComponent], ty: &str) -> Option<&'a str> {
    components
        .iter()
        .find(|c| c.types.iter().any(|t| t == ty))
        .map(|c| c.long_name.as_str())
}

/// First component matching any of the given types, in priority order.
fn first_of<'a>(components: &'a [AddressComponent], types: &[&str]) -> Option<&'a str> {
    types.iter().find_map(|ty| component(components, ty))
}

fn extract_address(components: &[AddressComponent]) -> ResolvedAddress {
    let pick = |types: &[&str]| first_of(components, types).unwrap_or("").to_string();
    ResolvedAddress {
        city: pick(&["locality", "administrative_area_level_2"]),
        state: pick(&["administrative_area_level_1"]),
        country: pick(&["country"]),
        pincode: pick(&["postal_code"]),
        landmark: pick(&["point_of_interest", "premise"]),
        locality: pick(&["sublocality", "sublocality_level_1", "neighborhood"]),
    }
}

/// HTTP reverse geocoder against a Google-style geocoding endpoint.
pub struct HttpGeocoder {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpGeocoder {
    /// Build against the production endpoint. Fails eagerly when the API
    /// key is empty.
    pub fn new(api_key: &str) -> Result<Self, LocationError> {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    /// Build against a custom endpoint (tests point this at a local mock).
    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Result<Self, LocationError> {
        if api_key.is_empty() {
            return Err(LocationError::ConfigurationError(
                "geocoding API key is not set".to_string(),
            ));
        }
        let endpoint = Url::parse(endpoint).map_err(|e| {
            LocationError::ConfigurationError(format!("invalid geocoding endpoint: {e}"))
        })?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: api_key.to_string(),
        })
    }

    async fn fetch(&self, coordinate: Coordinate) -> Result<ResolvedAddress, LocationError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(
                "latlng",
                &format!("{},{}", coordinate.latitude, coordinate.longitude),
            )
            .append_pair("key", &self.api_key);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LocationError::ProviderError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(LocationError::ProviderError(format!(
                "geocoding endpoint returned status {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| LocationError::ProviderError(format!("bad geocoding response: {e}")))?;

        let components = body
            .results
            .first()
            .map(|r| r.address_components.as_slice())
            .filter(|c| !c.is_empty())
            .ok_or(LocationError::NoAddressFound)?;

        let address = extract_address(components);
        debug!("resolved {coordinate} to {address:?}");
        Ok(address)
    }
}

impl Geocoder for HttpGeocoder {
    fn resolve_address(
        &self,
        coordinate: Coordinate,
    ) -> BoxFuture<'_, Result<ResolvedAddress, LocationError>> {
        Box::pin(self.fetch(coordinate))
    }
}
