//! # Stop Cluster
//!
//! Road-aware clustering engine for grouping serviceable stops that can be
//! walked between, so a route planner can treat each cluster as a single
//! vehicle stop.
//!
//! ## Features
//!
//! - Transitive-closure clustering with a hard walking-distance cutoff
//! - Road identity awareness: stops on the same named road group together,
//!   stops near an intersection group across roads
//! - Batched snap-to-roads resolution with a persistent SQLite cache
//! - Distance-only fallback when road data is unavailable
//! - Cluster metadata: centroid, dominant road, walking distance, bounds
//!
//! ## Quick Start
//!
//! ```
//! use stop_cluster::{grouping, ClusterConfig, GeoPoint};
//!
//! let points = vec![
//!     GeoPoint::new("c1", "Corner shop", 51.5074, -0.1278),
//!     GeoPoint::new("c2", "Post office", 51.5078, -0.1280),
//!     GeoPoint::new("c3", "Depot", 51.6200, -0.2100),
//! ];
//!
//! // Distance-only partitioning; `ClusterEngine` layers road identity on top.
//! let clusters = grouping::distance_clusters(&points, &ClusterConfig::default());
//! assert_eq!(clusters.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

pub mod cache;
pub mod distance;
pub mod engine;
pub mod error;
pub mod grouping;
#[cfg(feature = "http")]
pub mod http;
pub mod lookup;
pub mod metadata;

pub use cache::RoadCache;
pub use engine::ClusterEngine;
pub use error::{ClusterError, Result};
#[cfg(feature = "http")]
pub use http::HttpRoadLookup;
pub use lookup::{RoadLookup, RoadPlace, SnappedPoint};

// ============================================================================
// Core Types
// ============================================================================

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite and within geographic range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Canonical cache key for this coordinate, at six decimal places
    /// (roughly 0.1 m). Coordinates that agree to six decimals share road
    /// lookup results.
    ///
    /// # Example
    ///
    /// ```
    /// use stop_cluster::LatLon;
    ///
    /// let coord = LatLon::new(51.5074, -0.1278);
    /// assert_eq!(coord.fingerprint(), "51.507400,-0.127800");
    /// ```
    pub fn fingerprint(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// A stop to be clustered: a stable identifier, a display name, and an
/// optional street address plus coordinates.
///
/// Coordinates are optional because upstream geocoding can fail; a point
/// without a usable coordinate is never joined to anything and comes back
/// as a placeholder singleton cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl GeoPoint {
    /// Create a point with known coordinates.
    ///
    /// # Example
    ///
    /// ```
    /// use stop_cluster::GeoPoint;
    ///
    /// let point = GeoPoint::new("c1", "Corner shop", 51.5074, -0.1278);
    /// assert!(point.has_coordinates());
    /// ```
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// Create a point whose geocoding failed upstream.
    pub fn without_coordinates(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// The point's coordinate, if present and geographically valid.
    /// Out-of-range or non-finite values are treated as absent.
    pub fn coordinate(&self) -> Option<LatLon> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return None;
        };
        let coord = LatLon::new(latitude, longitude);
        coord.is_valid().then_some(coord)
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinate().is_some()
    }

    /// Cache key for this point's coordinate, when it has one.
    pub fn fingerprint(&self) -> Option<String> {
        self.coordinate().map(|coord| coord.fingerprint())
    }
}

/// Axis-aligned bounding box of a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Compute bounds from a coordinate slice. Returns `None` for an empty
    /// slice.
    pub fn from_points(points: &[LatLon]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lng: first.longitude,
            max_lng: first.longitude,
        };
        for point in &points[1..] {
            bounds.min_lat = bounds.min_lat.min(point.latitude);
            bounds.max_lat = bounds.max_lat.max(point.latitude);
            bounds.min_lng = bounds.min_lng.min(point.longitude);
            bounds.max_lng = bounds.max_lng.max(point.longitude);
        }
        Some(bounds)
    }
}

/// Road identity resolved for one coordinate fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadInfo {
    /// Human-readable road name, or [`RoadInfo::UNKNOWN_ROAD`] when naming
    /// failed or the point snapped to an unnamed segment.
    pub road_name: String,
    /// Opaque road segment identifier. Empty when the snap carried none.
    pub road_id: String,
    /// Position on the road network the point snapped to.
    pub snapped: LatLon,
}

impl RoadInfo {
    /// Sentinel name for points whose road could not be identified. Points
    /// carrying it still cluster by distance but never by shared road name.
    pub const UNKNOWN_ROAD: &'static str = "Unknown Road";

    /// Road info for a point that snapped (or fell back) without identity.
    pub fn unknown(snapped: LatLon) -> Self {
        Self {
            road_name: Self::UNKNOWN_ROAD.to_string(),
            road_id: String::new(),
            snapped,
        }
    }

    /// The road name, unless it is empty or the unknown-road sentinel.
    pub fn known_road_name(&self) -> Option<&str> {
        if self.road_name.is_empty() || self.road_name == Self::UNKNOWN_ROAD {
            None
        } else {
            Some(&self.road_name)
        }
    }

    /// The road identifier, unless it is empty.
    pub fn known_road_id(&self) -> Option<&str> {
        if self.road_id.is_empty() {
            None
        } else {
            Some(&self.road_id)
        }
    }
}

/// One group of stops close enough to serve from a single vehicle stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Member points in the order the grouping scan added them.
    pub points: Vec<GeoPoint>,
    /// Arithmetic mean of the member coordinates.
    pub centroid: LatLon,
    /// Most common known road name among members, if any.
    pub road_name: Option<String>,
    /// Road identifier of the first member, if known.
    pub road_id: Option<String>,
    /// Meters walked visiting members in cluster order.
    pub walking_distance: f64,
    /// Bounding box of the member coordinates.
    pub bounds: Option<Bounds>,
}

/// Tuning knobs for the clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Hard cutoff in meters: two points farther apart than this never share
    /// a cluster, whatever road they are on.
    pub max_walking_distance: f64,
    /// Distance in meters under which two points on different named roads
    /// still join, covering corners and intersections.
    pub intersection_tolerance: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_walking_distance: 200.0,
            intersection_tolerance: 50.0,
        }
    }
}
