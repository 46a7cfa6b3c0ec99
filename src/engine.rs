//! # Cluster Engine
//!
//! Orchestrates one grouping request end to end: cache consultation,
//! batched road resolution, road-aware partitioning, metadata, and the
//! distance-only fallback when road data is unavailable.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::cache::RoadCache;
use crate::error::Result;
use crate::lookup::{resolve_roads, RoadLookup};
use crate::{grouping, metadata, Cluster, ClusterConfig, GeoPoint, LatLon, RoadInfo};

/// Road-aware clustering engine.
///
/// Holds the road lookup service, the persistent road cache, and the
/// clustering configuration. One engine serves many grouping requests and
/// accumulates cache entries across them.
pub struct ClusterEngine<L> {
    lookup: L,
    cache: RoadCache,
    config: ClusterConfig,
}

impl<L: RoadLookup> ClusterEngine<L> {
    /// Create an engine with the default configuration.
    pub fn new(lookup: L, cache: RoadCache) -> Self {
        Self::with_config(lookup, cache, ClusterConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(lookup: L, cache: RoadCache, config: ClusterConfig) -> Self {
        Self {
            lookup,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// The engine's road cache, e.g. for inspecting entry counts.
    pub fn cache(&mut self) -> &mut RoadCache {
        &mut self.cache
    }

    /// Group points into clusters of stops walkable from one vehicle stop.
    ///
    /// Never fails: road data problems degrade to distance-only clustering
    /// and points without usable coordinates come back as placeholder
    /// singletons at the end of the result. Every input point appears in
    /// exactly one cluster.
    pub fn group_points(&mut self, points: &[GeoPoint]) -> Vec<Cluster> {
        if points.is_empty() {
            return Vec::new();
        }

        let coordinated: Vec<&GeoPoint> = points.iter().filter(|p| p.has_coordinates()).collect();
        debug!(
            "grouping {} points ({} with coordinates)",
            points.len(),
            coordinated.len()
        );

        let mut clusters = if coordinated.is_empty() {
            Vec::new()
        } else {
            match self.resolve_road_info(&coordinated) {
                Ok(road_info) => grouping::road_aware_clusters(points, &road_info, &self.config)
                    .into_iter()
                    .map(|members| metadata::annotate(members, &road_info))
                    .collect(),
                Err(err) => {
                    warn!("{}; falling back to distance-only clustering", err);
                    grouping::distance_clusters(points, &self.config)
                        .into_iter()
                        .map(metadata::fallback_cluster)
                        .collect()
                }
            }
        };

        for point in points.iter().filter(|p| !p.has_coordinates()) {
            debug!("point {} has no usable coordinates", point.id);
            clusters.push(metadata::placeholder_cluster(point));
        }

        info!(
            "grouped {} points into {} clusters",
            points.len(),
            clusters.len()
        );
        clusters
    }

    /// Road info for every coordinated point, from cache where possible and
    /// from one batched lookup for the rest.
    fn resolve_road_info(
        &mut self,
        coordinated: &[&GeoPoint],
    ) -> Result<HashMap<String, RoadInfo>> {
        let mut road_info = HashMap::with_capacity(coordinated.len());
        let mut misses: Vec<LatLon> = Vec::new();

        for point in coordinated {
            let Some(coord) = point.coordinate() else {
                continue;
            };
            let fingerprint = coord.fingerprint();
            if let Some(hit) = self.cache.get(&fingerprint) {
                debug!("using cached road data for {}", point.name);
                road_info.insert(fingerprint, hit.clone());
            } else {
                misses.push(coord);
            }
        }

        if !misses.is_empty() {
            info!(
                "fetching road data for {} of {} points",
                misses.len(),
                coordinated.len()
            );
            let fetched = resolve_roads(&self.lookup, &misses)?;
            for (fingerprint, data) in &fetched {
                road_info.insert(fingerprint.clone(), data.clone());
            }
            self.cache.put_all(fetched);
        }

        Ok(road_info)
    }
}
