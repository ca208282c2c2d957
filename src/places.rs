//! Free-text place search for the picker's suggestion list.
//!
//! The provider response is a feature collection where each feature carries
//! `properties.formatted` (display string) plus `properties.lat`/`lon`.
//! Features missing a coordinate are skipped rather than failing the whole
//! query: suggestions are best-effort.

use futures::future::BoxFuture;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::LocationError;
use crate::types::Coordinate;

const DEFAULT_ENDPOINT: &str = "https://api.geoapify.com/v1/geocode/autocomplete";

/// One ranked place suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub label: String,
    pub coordinate: Coordinate,
}

/// Interface for place-suggestion backends.
pub trait PlaceSearch: Send + Sync {
    /// Fetch ranked suggestions for a free-text query.
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Suggestion>, LocationError>>;
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    formatted: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

fn into_suggestions(body: FeatureCollection) -> Vec<Suggestion> {
    body.features
        .into_iter()
        .filter_map(|feature| {
            let p = feature.properties;
            match (p.lat, p.lon) {
                (Some(lat), Some(lon)) => Some(Suggestion {
                    label: p.formatted.unwrap_or_default(),
                    coordinate: Coordinate::new(lat, lon),
                }),
                _ => None,
            }
        })
        .collect()
}

/// HTTP place search against a Geoapify-style autocomplete endpoint.
pub struct HttpPlaceSearch {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpPlaceSearch {
    /// Build against the production endpoint. Fails eagerly when the API
    /// key is empty.
    pub fn new(api_key: &str) -> Result<Self, LocationError> {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    /// Build against a custom endpoint (tests point this at a local mock).
    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Result<Self, LocationError> {
        if api_key.is_empty() {
            return Err(LocationError::ConfigurationError(
                "place-suggestion API key is not set".to_string(),
            ));
        }
        let endpoint = Url::parse(endpoint).map_err(|e| {
            LocationError::ConfigurationError(format!("invalid place-search endpoint: {e}"))
        })?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: api_key.to_string(),
        })
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>, LocationError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("text", query)
            .append_pair("limit", &limit.to_string())
            .append_pair("apiKey", &self.api_key);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LocationError::ProviderError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(LocationError::ProviderError(format!(
                "place-search endpoint returned status {}",
                response.status()
            )));
        }

        let body: FeatureCollection = response
            .json()
            .await
            .map_err(|e| LocationError::ProviderError(format!("bad place-search response: {e}")))?;

        let suggestions = into_suggestions(body);
        debug!("query {query:?} produced {} suggestions", suggestions.len());
        Ok(suggestions)
    }
}

impl PlaceSearch for HttpPlaceSearch {
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Suggestion>, LocationError>> {
        let query = query.to_string();
        Box::pin(async move { self.fetch(&query, limit).await })
    }
}
