//! HTTP road lookup client.
//!
//! Implements [`RoadLookup`] against the hosted snap-to-roads and place
//! naming services. Only compiled with the `http` feature; tests and
//! embedders can supply their own [`RoadLookup`] instead.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{ClusterError, Result};
use crate::lookup::{RoadLookup, RoadPlace, SnappedPoint};
use crate::LatLon;

/// Timeout for the batched snap call.
const SNAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for each naming call.
const NAMING_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_SNAP_URL: &str = "https://roads.googleapis.com/v1/snapToRoads";
const DEFAULT_PLACE_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";

/// Blocking HTTP [`RoadLookup`] backed by the hosted road services.
pub struct HttpRoadLookup {
    client: Client,
    api_key: String,
    snap_url: String,
    place_url: String,
}

impl HttpRoadLookup {
    /// Build a client against the default hosted endpoints.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoints(api_key, DEFAULT_SNAP_URL, DEFAULT_PLACE_URL)
    }

    /// Build a client against custom endpoints, e.g. a local stub server.
    pub fn with_endpoints(
        api_key: impl Into<String>,
        snap_url: impl Into<String>,
        place_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(SNAP_TIMEOUT)
            .build()
            .map_err(|e| ClusterError::road_data(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            snap_url: snap_url.into(),
            place_url: place_url.into(),
        })
    }
}

impl RoadLookup for HttpRoadLookup {
    fn snap_to_roads(&self, coords: &[LatLon]) -> Result<Vec<SnappedPoint>> {
        let path = coords
            .iter()
            .map(|c| format!("{},{}", c.latitude, c.longitude))
            .collect::<Vec<_>>()
            .join("|");

        debug!("snapping {} coordinates to roads", coords.len());
        let response = self
            .client
            .get(&self.snap_url)
            .query(&[
                ("path", path.as_str()),
                ("interpolate", "true"),
                ("key", self.api_key.as_str()),
            ])
            .timeout(SNAP_TIMEOUT)
            .send()
            .map_err(|e| ClusterError::road_data(format!("snap request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| ClusterError::road_data(format!("snap request rejected: {}", e)))?;

        let body: SnapResponse = response
            .json()
            .map_err(|e| ClusterError::road_data(format!("malformed snap response: {}", e)))?;
        let Some(entries) = body.snapped_points else {
            return Err(ClusterError::road_data("no road data returned"));
        };
        Ok(convert_snap_entries(entries))
    }

    fn road_name(&self, road_id: &str) -> Result<RoadPlace> {
        debug!("resolving name for road {}", road_id);
        let response = self
            .client
            .get(&self.place_url)
            .query(&[
                ("place_id", road_id),
                ("fields", "name,formatted_address"),
                ("key", self.api_key.as_str()),
            ])
            .timeout(NAMING_TIMEOUT)
            .send()
            .map_err(|e| ClusterError::naming(road_id, e))?
            .error_for_status()
            .map_err(|e| ClusterError::naming(road_id, e))?;

        let body: PlaceResponse = response
            .json()
            .map_err(|e| ClusterError::naming(road_id, e))?;
        if body.status != "OK" {
            return Err(ClusterError::naming(
                road_id,
                format!("service status {}", body.status),
            ));
        }
        let result = body
            .result
            .ok_or_else(|| ClusterError::naming(road_id, "empty result"))?;
        Ok(RoadPlace {
            display_name: result.name.unwrap_or_default(),
            formatted_address: result.formatted_address.unwrap_or_default(),
        })
    }
}

/// Convert wire entries to [`SnappedPoint`]s, dropping interpolated points
/// that carry no original index.
fn convert_snap_entries(entries: Vec<SnapEntry>) -> Vec<SnappedPoint> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let original_index = entry.original_index?;
            Some(SnappedPoint {
                original_index,
                road_id: entry.place_id,
                snapped: LatLon::new(entry.location.latitude, entry.location.longitude),
            })
        })
        .collect()
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapResponse {
    /// Absent when the service matched nothing; treated as a snap failure.
    #[serde(default)]
    snapped_points: Option<Vec<SnapEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapEntry {
    location: SnapLocation,
    /// Absent on points interpolated between inputs.
    #[serde(default)]
    original_index: Option<usize>,
    #[serde(default)]
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnapLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct PlaceResponse {
    status: String,
    #[serde(default)]
    result: Option<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
}
