//! Core data model for the location service.
//!
//! Internal APIs work with [`Coordinate`] (latitude first); the backend wire
//! format is [`GeoPoint`] (GeoJSON, longitude first). Conversion happens only
//! at the serialization boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A device or map position. Latitude-first, degrees.
///
/// No range validation is performed here; callers are responsible for
/// discarding obviously bogus fixes. An unset position is `Option::None`,
/// never a `(0, 0)` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PointKind {
    Point,
}

/// GeoJSON `Point` wire shape: `{"type": "Point", "coordinates": [lon, lat]}`.
///
/// The `[f64; 2]` coordinates array enforces the exactly-two-entries
/// invariant at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    kind: PointKind,
    coordinates: [f64; 2],
}

impl From<Coordinate> for GeoPoint {
    fn from(c: Coordinate) -> Self {
        Self {
            kind: PointKind::Point,
            coordinates: [c.longitude, c.latitude],
        }
    }
}

impl From<GeoPoint> for Coordinate {
    fn from(p: GeoPoint) -> Self {
        Self {
            latitude: p.coordinates[1],
            longitude: p.coordinates[0],
        }
    }
}

/// A structured address resolved from a coordinate.
///
/// Every field is an empty string when the provider returned no matching
/// component, never null, so consumers can concatenate and display without
/// presence checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub city: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
    pub landmark: String,
    /// Fine-grained area (sublocality/neighborhood), distinct from `city`.
    pub locality: String,
}

impl ResolvedAddress {
    /// Single display line built from the fine-grained fields, empty parts
    /// skipped (e.g. "India Gate, Connaught Place").
    pub fn address_line(&self) -> String {
        [self.landmark.as_str(), self.locality.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// An immutable, point-in-time resolved location.
///
/// Produced once per successful acquisition+geocode cycle and superseded,
/// never mutated, by the next cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub coordinate: Coordinate,
    pub address: ResolvedAddress,
    pub resolved_at: DateTime<Utc>,
}

/// Which marker currently receives updates from search, drag, and
/// live tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Start,
    End,
}

/// The two independently settable picker markers.
///
/// Either, both, or neither may be unset at any time; only the picker's
/// confirm step requires at least one to be present.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarkerPair {
    pub start: Option<Coordinate>,
    pub end: Option<Coordinate>,
}

impl MarkerPair {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn get(&self, which: Focus) -> Option<Coordinate> {
        match which {
            Focus::Start => self.start,
            Focus::End => self.end,
        }
    }

    pub fn set(&mut self, which: Focus, coordinate: Option<Coordinate>) {
        match which {
            Focus::Start => self.start = coordinate,
            Focus::End => self.end = coordinate,
        }
    }
}
