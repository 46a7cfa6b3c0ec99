//! Point partitioning.
//!
//! Partitions coordinated points into clusters under a pairwise
//! joinability predicate, growing each cluster to the transitive closure
//! of the predicate. Two predicates are provided: the road-aware rule used
//! on the happy path and the distance-only rule used as fallback.
//!
//! Cluster and member order are part of the contract: clusters are seeded
//! in input order, and each cluster repeatedly absorbs the earliest
//! remaining point joinable to any current member. Downstream metadata
//! (walking distance, first-member road id) depends on this order.

use std::collections::HashMap;

use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};

use crate::distance::{degree_radius, planar_distance};
use crate::{ClusterConfig, GeoPoint, LatLon, RoadInfo};

/// Spatial index entry: position in `[lng, lat]` order plus point index.
type IndexedPosition = GeomWithData<[f64; 2], usize>;

/// Whether two points may share a cluster under the road-aware rule.
///
/// Evaluated in order: points without coordinates never join; points
/// farther apart than the walking cutoff never join; points on the same
/// known road always join; otherwise only points within the intersection
/// tolerance join. Unknown-road sentinels never satisfy the same-road
/// test, so two unidentified points still need to be within tolerance.
pub fn should_join(
    p: &GeoPoint,
    q: &GeoPoint,
    road_info: &HashMap<String, RoadInfo>,
    config: &ClusterConfig,
) -> bool {
    let (Some(cp), Some(cq)) = (p.coordinate(), q.coordinate()) else {
        return false;
    };
    let distance = planar_distance(cp, cq);
    if distance > config.max_walking_distance {
        return false;
    }

    let name_p = road_info
        .get(&cp.fingerprint())
        .and_then(|info| info.known_road_name());
    let name_q = road_info
        .get(&cq.fingerprint())
        .and_then(|info| info.known_road_name());
    if let (Some(a), Some(b)) = (name_p, name_q) {
        if a == b {
            return true;
        }
    }

    distance <= config.intersection_tolerance
}

/// Whether two points are within the walking cutoff of each other.
pub fn within_walking_distance(p: &GeoPoint, q: &GeoPoint, config: &ClusterConfig) -> bool {
    match (p.coordinate(), q.coordinate()) {
        (Some(a), Some(b)) => planar_distance(a, b) <= config.max_walking_distance,
        _ => false,
    }
}

/// Partition points under the road-aware rule.
///
/// Points without usable coordinates are excluded from the result; the
/// engine turns those into placeholder singletons separately.
pub fn road_aware_clusters<'a>(
    points: &'a [GeoPoint],
    road_info: &HashMap<String, RoadInfo>,
    config: &ClusterConfig,
) -> Vec<Vec<&'a GeoPoint>> {
    partition(points, config, |p, q| should_join(p, q, road_info, config))
}

/// Partition points by walking distance alone.
pub fn distance_clusters<'a>(
    points: &'a [GeoPoint],
    config: &ClusterConfig,
) -> Vec<Vec<&'a GeoPoint>> {
    partition(points, config, |p, q| within_walking_distance(p, q, config))
}

/// Grow clusters to the transitive closure of `should_join` over the
/// coordinated points, preserving the seeded scan order.
fn partition<'a, F>(
    points: &'a [GeoPoint],
    config: &ClusterConfig,
    should_join: F,
) -> Vec<Vec<&'a GeoPoint>>
where
    F: Fn(&GeoPoint, &GeoPoint) -> bool,
{
    let coordinated: Vec<(&GeoPoint, LatLon)> = points
        .iter()
        .filter_map(|p| p.coordinate().map(|c| (p, c)))
        .collect();
    let n = coordinated.len();
    if n == 0 {
        return Vec::new();
    }

    // Candidate pre-filter: no pair farther apart than the walking cutoff
    // can ever join, so each member only needs to test points inside its
    // cutoff bounding box.
    let tree: RTree<IndexedPosition> = RTree::bulk_load(
        coordinated
            .iter()
            .enumerate()
            .map(|(i, (_, c))| GeomWithData::new([c.longitude, c.latitude], i))
            .collect(),
    );
    let (lat_radius, lng_radius) = degree_radius(config.max_walking_distance);

    // Flag every ungrouped point inside `member`'s cutoff box that joins it.
    let mark_joinable = |member: usize, grouped: &[bool], joinable: &mut [bool]| {
        let (point, position) = coordinated[member];
        let envelope = AABB::from_corners(
            [position.longitude - lng_radius, position.latitude - lat_radius],
            [position.longitude + lng_radius, position.latitude + lat_radius],
        );
        for neighbor in tree.locate_in_envelope_intersecting(&envelope) {
            let candidate = neighbor.data;
            if !grouped[candidate]
                && !joinable[candidate]
                && should_join(point, coordinated[candidate].0)
            {
                joinable[candidate] = true;
            }
        }
    };

    let mut grouped = vec![false; n];
    let mut clusters = Vec::new();

    for seed in 0..n {
        if grouped[seed] {
            continue;
        }
        grouped[seed] = true;
        let mut members = vec![seed];
        let mut joinable = vec![false; n];
        mark_joinable(seed, &grouped, &mut joinable);

        // Absorb the earliest remaining joinable point; each absorbed point
        // may bring further points into reach.
        while let Some(next) = (0..n).find(|&c| !grouped[c] && joinable[c]) {
            grouped[next] = true;
            members.push(next);
            mark_joinable(next, &grouped, &mut joinable);
        }

        clusters.push(members.into_iter().map(|i| coordinated[i].0).collect());
    }
    clusters
}
