//! Static route-map export.
//!
//! Builds the shareable static-map URL for an ordered list of route points:
//! one polyline path through every point plus a marker per point. The image
//! itself is rendered by the maps backend; this module only assembles the
//! request.

use url::Url;

use crate::error::LocationError;
use crate::types::Coordinate;

const STATIC_MAP_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/staticmap";
const IMAGE_SIZE: &str = "600x400";
const PATH_STYLE: &str = "color:0x003891|weight:4";
const MARKER_STYLE: &str = "color:blue";

/// Build the static-map URL for a route. Fails with `SelectionRequired`
/// when there are no points to render.
pub fn static_map_url(api_key: &str, points: &[Coordinate]) -> Result<Url, LocationError> {
    if api_key.is_empty() {
        return Err(LocationError::ConfigurationError(
            "maps API key is not set".to_string(),
        ));
    }
    if points.is_empty() {
        return Err(LocationError::SelectionRequired);
    }

    let path = points
        .iter()
        .map(|c| format!("{},{}", c.latitude, c.longitude))
        .collect::<Vec<_>>()
        .join("|");

    let mut url = Url::parse(STATIC_MAP_ENDPOINT)
        .map_err(|e| LocationError::ConfigurationError(format!("invalid map endpoint: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("size", IMAGE_SIZE);
        query.append_pair("path", &format!("{PATH_STYLE}|{path}"));
        for point in points {
            query.append_pair(
                "markers",
                &format!("{MARKER_STYLE}|{},{}", point.latitude, point.longitude),
            );
        }
        query.append_pair("key", api_key);
    }
    Ok(url)
}
