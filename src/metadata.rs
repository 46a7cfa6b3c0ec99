//! Cluster metadata.
//!
//! Turns ordered member lists from [`crate::grouping`] into [`Cluster`]
//! values: centroid, dominant road, walking distance, bounds. Includes the
//! degraded constructors for fallback clusters and uncoordinated
//! placeholder singletons.

use std::collections::HashMap;

use crate::distance::path_length;
use crate::{Bounds, Cluster, GeoPoint, LatLon, RoadInfo};

/// Road label applied to clusters produced by the distance-only fallback.
pub const FALLBACK_ROAD_NAME: &str = "Unknown (Fallback)";

/// Build a fully annotated cluster from road-aware members.
///
/// Member order is preserved and drives the walking distance (consecutive
/// legs in scan order) and the road identifier (first member's road).
pub fn annotate(members: Vec<&GeoPoint>, road_info: &HashMap<String, RoadInfo>) -> Cluster {
    let positions: Vec<LatLon> = members.iter().filter_map(|p| p.coordinate()).collect();
    Cluster {
        centroid: centroid(&positions),
        road_name: dominant_road_name(&members, road_info),
        road_id: first_member_road_id(&members, road_info),
        walking_distance: path_length(&positions),
        bounds: Bounds::from_points(&positions),
        points: members.into_iter().cloned().collect(),
    }
}

/// Build a cluster for the distance-only fallback path.
///
/// Road identity is unavailable here, so the cluster is tagged with
/// [`FALLBACK_ROAD_NAME`] and reports no walking distance.
pub fn fallback_cluster(members: Vec<&GeoPoint>) -> Cluster {
    let positions: Vec<LatLon> = members.iter().filter_map(|p| p.coordinate()).collect();
    Cluster {
        centroid: centroid(&positions),
        road_name: Some(FALLBACK_ROAD_NAME.to_string()),
        road_id: None,
        walking_distance: 0.0,
        bounds: Bounds::from_points(&positions),
        points: members.into_iter().cloned().collect(),
    }
}

/// Build the placeholder singleton for a point without usable coordinates.
pub fn placeholder_cluster(point: &GeoPoint) -> Cluster {
    Cluster {
        points: vec![point.clone()],
        centroid: LatLon::new(0.0, 0.0),
        road_name: None,
        road_id: None,
        walking_distance: 0.0,
        bounds: None,
    }
}

/// Arithmetic mean of a coordinate set, or the origin when empty.
pub fn centroid(positions: &[LatLon]) -> LatLon {
    if positions.is_empty() {
        return LatLon::new(0.0, 0.0);
    }
    let count = positions.len() as f64;
    let lat = positions.iter().map(|p| p.latitude).sum::<f64>() / count;
    let lng = positions.iter().map(|p| p.longitude).sum::<f64>() / count;
    LatLon::new(lat, lng)
}

/// Most common known road name among members. Counted in first-seen order
/// so ties break toward the earlier member; sentinel and missing names do
/// not participate.
fn dominant_road_name(
    members: &[&GeoPoint],
    road_info: &HashMap<String, RoadInfo>,
) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for point in members {
        let Some(fingerprint) = point.fingerprint() else {
            continue;
        };
        let Some(name) = road_info
            .get(&fingerprint)
            .and_then(|info| info.known_road_name())
        else {
            continue;
        };
        match counts.iter_mut().find(|(seen, _)| *seen == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for &(name, count) in &counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// Road identifier of the first member, when one was resolved.
fn first_member_road_id(
    members: &[&GeoPoint],
    road_info: &HashMap<String, RoadInfo>,
) -> Option<String> {
    let fingerprint = members.first()?.fingerprint()?;
    road_info
        .get(&fingerprint)
        .and_then(|info| info.known_road_id())
        .map(str::to_string)
}
