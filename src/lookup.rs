//! Road lookup contract and batch resolution.
//!
//! [`RoadLookup`] abstracts the two external road-data services: a batched
//! snap-to-roads call and a per-identifier naming call. [`resolve_roads`]
//! drives them for a whole request: one snap round trip, one naming call
//! per distinct road, and per-road degradation to the unknown-road
//! sentinel when naming fails.

use std::collections::HashMap;

use log::warn;

use crate::error::Result;
use crate::{LatLon, RoadInfo};

/// Suffix tokens that mark a display name as a street name.
const ROAD_SUFFIXES: &[&str] = &[
    "st", "street", "ave", "avenue", "rd", "road", "blvd", "boulevard", "dr", "drive", "ln",
    "lane", "way", "ct", "court",
];

/// One entry of a batched snap-to-roads response.
#[derive(Debug, Clone, PartialEq)]
pub struct SnappedPoint {
    /// Index into the submitted coordinate batch this snap refers to.
    pub original_index: usize,
    /// Opaque identifier of the matched road segment, when one exists.
    pub road_id: Option<String>,
    /// Position on the road network.
    pub snapped: LatLon,
}

/// Raw naming-service response for one road identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadPlace {
    /// Display name of the place, not necessarily a street name.
    pub display_name: String,
    /// Full formatted address, used when the display name is not a road.
    pub formatted_address: String,
}

/// External road data services consumed by the engine.
///
/// Implementations are shared across threads by the naming fan-out, hence
/// the `Sync` bound.
pub trait RoadLookup: Sync {
    /// Snap a batch of coordinates to the road network in one round trip.
    ///
    /// Entries may come back in any order and need not cover every input
    /// index; uncovered inputs degrade to the unknown-road sentinel.
    fn snap_to_roads(&self, coords: &[LatLon]) -> Result<Vec<SnappedPoint>>;

    /// Resolve the place behind one road identifier.
    fn road_name(&self, road_id: &str) -> Result<RoadPlace>;
}

/// Resolve road identity for a batch of coordinates.
///
/// Issues exactly one snap call for the whole batch, then one naming call
/// per distinct road identifier (in first-appearance order). Returns a map
/// from coordinate fingerprint to [`RoadInfo`] covering every input
/// coordinate.
///
/// A snap failure is returned to the caller, which switches the request to
/// distance-only clustering. A naming failure only downgrades the affected
/// road to [`RoadInfo::UNKNOWN_ROAD`].
pub fn resolve_roads<L: RoadLookup>(
    lookup: &L,
    coords: &[LatLon],
) -> Result<HashMap<String, RoadInfo>> {
    if coords.is_empty() {
        return Ok(HashMap::new());
    }

    let snapped = lookup.snap_to_roads(coords)?;

    // First snap entry per input index wins; out-of-range indices are junk.
    let mut by_index: Vec<Option<&SnappedPoint>> = vec![None; coords.len()];
    for entry in &snapped {
        if let Some(slot) = by_index.get_mut(entry.original_index) {
            if slot.is_none() {
                *slot = Some(entry);
            }
        }
    }

    // Distinct road identifiers in first-appearance order.
    let mut road_ids: Vec<String> = Vec::new();
    for entry in by_index.iter().flatten() {
        if let Some(id) = &entry.road_id {
            if !road_ids.iter().any(|seen| seen == id) {
                road_ids.push(id.clone());
            }
        }
    }

    let names = name_roads(lookup, &road_ids);

    let mut resolved = HashMap::with_capacity(coords.len());
    for (index, coord) in coords.iter().enumerate() {
        let info = match by_index[index] {
            Some(entry) => match &entry.road_id {
                Some(id) => RoadInfo {
                    road_name: names
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| RoadInfo::UNKNOWN_ROAD.to_string()),
                    road_id: id.clone(),
                    snapped: entry.snapped,
                },
                None => RoadInfo::unknown(entry.snapped),
            },
            // Not covered by the snap response: keep the original position.
            None => RoadInfo::unknown(*coord),
        };
        resolved.insert(coord.fingerprint(), info);
    }
    Ok(resolved)
}

#[cfg(feature = "parallel")]
fn name_roads<L: RoadLookup>(lookup: &L, road_ids: &[String]) -> HashMap<String, String> {
    use rayon::prelude::*;

    road_ids
        .par_iter()
        .map(|id| (id.clone(), resolve_one_name(lookup, id)))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn name_roads<L: RoadLookup>(lookup: &L, road_ids: &[String]) -> HashMap<String, String> {
    road_ids
        .iter()
        .map(|id| (id.clone(), resolve_one_name(lookup, id)))
        .collect()
}

fn resolve_one_name<L: RoadLookup>(lookup: &L, road_id: &str) -> String {
    match lookup.road_name(road_id) {
        Ok(place) => road_name_from_place(&place),
        Err(err) => {
            warn!("{}; using sentinel name", err);
            RoadInfo::UNKNOWN_ROAD.to_string()
        }
    }
}

/// Extract a street name from a naming-service response.
///
/// The display name is used directly when it looks like a road; otherwise
/// the first address component is parsed, and failing that the sentinel is
/// returned.
pub(crate) fn road_name_from_place(place: &RoadPlace) -> String {
    if looks_like_road_name(&place.display_name) {
        return place.display_name.clone();
    }
    road_name_from_address(&place.formatted_address)
}

/// Whether a display name reads as a street name: any whitespace-separated
/// word, minus trailing punctuation, matching a known road suffix.
fn looks_like_road_name(name: &str) -> bool {
    name.split_whitespace()
        .map(|word| word.trim_end_matches(['.', ',']).to_lowercase())
        .any(|word| ROAD_SUFFIXES.contains(&word.as_str()))
}

/// Take the first comma-separated component of a formatted address and
/// strip leading house numbers. `"123 Main St, Springfield"` parses to
/// `"Main St"`.
pub(crate) fn road_name_from_address(formatted_address: &str) -> String {
    let first_component = formatted_address.split(',').next().unwrap_or("");
    let words: Vec<&str> = first_component
        .split_whitespace()
        .skip_while(|word| word.chars().all(|c| c.is_ascii_digit()))
        .collect();
    if words.is_empty() {
        RoadInfo::UNKNOWN_ROAD.to_string()
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;

    /// Scripted lookup with canned snap entries and per-id names.
    struct ScriptedLookup {
        snap: Vec<SnappedPoint>,
        names: HashMap<String, RoadPlace>,
        failing_ids: Vec<String>,
    }

    impl ScriptedLookup {
        fn new(snap: Vec<SnappedPoint>) -> Self {
            Self {
                snap,
                names: HashMap::new(),
                failing_ids: Vec::new(),
            }
        }

        fn with_name(mut self, id: &str, display_name: &str, formatted_address: &str) -> Self {
            self.names.insert(
                id.to_string(),
                RoadPlace {
                    display_name: display_name.to_string(),
                    formatted_address: formatted_address.to_string(),
                },
            );
            self
        }

        fn with_failing_id(mut self, id: &str) -> Self {
            self.failing_ids.push(id.to_string());
            self
        }
    }

    impl RoadLookup for ScriptedLookup {
        fn snap_to_roads(&self, _coords: &[LatLon]) -> Result<Vec<SnappedPoint>> {
            Ok(self.snap.clone())
        }

        fn road_name(&self, road_id: &str) -> Result<RoadPlace> {
            if self.failing_ids.iter().any(|id| id == road_id) {
                return Err(ClusterError::naming(road_id, "scripted failure"));
            }
            self.names
                .get(road_id)
                .cloned()
                .ok_or_else(|| ClusterError::naming(road_id, "not scripted"))
        }
    }

    fn snap(index: usize, id: Option<&str>, lat: f64, lon: f64) -> SnappedPoint {
        SnappedPoint {
            original_index: index,
            road_id: id.map(str::to_string),
            snapped: LatLon::new(lat, lon),
        }
    }

    #[test]
    fn test_resolve_empty_batch() {
        let lookup = ScriptedLookup::new(Vec::new());
        let resolved = resolve_roads(&lookup, &[]).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_resolve_names_per_distinct_road() {
        let coords = [
            LatLon::new(51.5074, -0.1278),
            LatLon::new(51.5075, -0.1278),
            LatLon::new(51.5090, -0.1300),
        ];
        let lookup = ScriptedLookup::new(vec![
            snap(0, Some("rd-1"), 51.50741, -0.12781),
            snap(1, Some("rd-1"), 51.50751, -0.12781),
            snap(2, Some("rd-2"), 51.50901, -0.13001),
        ])
        .with_name("rd-1", "Main St", "")
        .with_name("rd-2", "Oak Ave", "");

        let resolved = resolve_roads(&lookup, &coords).unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[&coords[0].fingerprint()].road_name, "Main St");
        assert_eq!(resolved[&coords[1].fingerprint()].road_name, "Main St");
        assert_eq!(resolved[&coords[1].fingerprint()].road_id, "rd-1");
        assert_eq!(resolved[&coords[2].fingerprint()].road_name, "Oak Ave");
        assert_eq!(
            resolved[&coords[0].fingerprint()].snapped,
            LatLon::new(51.50741, -0.12781)
        );
    }

    #[test]
    fn test_uncovered_input_gets_sentinel_at_original_position() {
        let coords = [LatLon::new(51.5074, -0.1278), LatLon::new(51.5090, -0.1300)];
        let lookup = ScriptedLookup::new(vec![snap(0, Some("rd-1"), 51.50741, -0.12781)])
            .with_name("rd-1", "Main St", "");

        let resolved = resolve_roads(&lookup, &coords).unwrap();
        let missing = &resolved[&coords[1].fingerprint()];
        assert_eq!(missing.road_name, RoadInfo::UNKNOWN_ROAD);
        assert_eq!(missing.road_id, "");
        assert_eq!(missing.snapped, coords[1]);
    }

    #[test]
    fn test_snap_without_road_id_gets_sentinel() {
        let coords = [LatLon::new(51.5074, -0.1278)];
        let lookup = ScriptedLookup::new(vec![snap(0, None, 51.50741, -0.12781)]);

        let resolved = resolve_roads(&lookup, &coords).unwrap();
        let info = &resolved[&coords[0].fingerprint()];
        assert_eq!(info.known_road_name(), None);
        assert_eq!(info.snapped, LatLon::new(51.50741, -0.12781));
    }

    #[test]
    fn test_duplicate_index_first_entry_wins() {
        let coords = [LatLon::new(51.5074, -0.1278)];
        let lookup = ScriptedLookup::new(vec![
            snap(0, Some("rd-1"), 51.50741, -0.12781),
            snap(0, Some("rd-2"), 51.50742, -0.12782),
        ])
        .with_name("rd-1", "Main St", "")
        .with_name("rd-2", "Oak Ave", "");

        let resolved = resolve_roads(&lookup, &coords).unwrap();
        assert_eq!(resolved[&coords[0].fingerprint()].road_name, "Main St");
    }

    #[test]
    fn test_out_of_range_index_is_ignored() {
        let coords = [LatLon::new(51.5074, -0.1278)];
        let lookup = ScriptedLookup::new(vec![
            snap(7, Some("rd-9"), 0.0, 0.0),
            snap(0, Some("rd-1"), 51.50741, -0.12781),
        ])
        .with_name("rd-1", "Main St", "");

        let resolved = resolve_roads(&lookup, &coords).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[&coords[0].fingerprint()].road_name, "Main St");
    }

    #[test]
    fn test_naming_failure_downgrades_single_road() {
        let coords = [LatLon::new(51.5074, -0.1278), LatLon::new(51.5090, -0.1300)];
        let lookup = ScriptedLookup::new(vec![
            snap(0, Some("rd-1"), 51.50741, -0.12781),
            snap(1, Some("rd-2"), 51.50901, -0.13001),
        ])
        .with_name("rd-1", "Main St", "")
        .with_failing_id("rd-2");

        let resolved = resolve_roads(&lookup, &coords).unwrap();
        assert_eq!(resolved[&coords[0].fingerprint()].road_name, "Main St");
        let degraded = &resolved[&coords[1].fingerprint()];
        assert_eq!(degraded.road_name, RoadInfo::UNKNOWN_ROAD);
        // The identifier itself is still kept.
        assert_eq!(degraded.road_id, "rd-2");
    }

    #[test]
    fn test_snap_failure_propagates() {
        struct FailingSnap;
        impl RoadLookup for FailingSnap {
            fn snap_to_roads(&self, _coords: &[LatLon]) -> Result<Vec<SnappedPoint>> {
                Err(ClusterError::road_data("scripted outage"))
            }
            fn road_name(&self, road_id: &str) -> Result<RoadPlace> {
                Err(ClusterError::naming(road_id, "unreachable"))
            }
        }

        let coords = [LatLon::new(51.5074, -0.1278)];
        let err = resolve_roads(&FailingSnap, &coords).unwrap_err();
        assert!(matches!(err, ClusterError::RoadData { .. }));
    }

    #[test]
    fn test_looks_like_road_name() {
        assert!(looks_like_road_name("Main St"));
        assert!(looks_like_road_name("Baker Street"));
        assert!(looks_like_road_name("Fifth Ave."));
        assert!(looks_like_road_name("northumberland avenue"));
        assert!(!looks_like_road_name("Springfield Mall"));
        assert!(!looks_like_road_name("The Coastal Path"));
        assert!(!looks_like_road_name(""));
    }

    #[test]
    fn test_road_name_from_address() {
        assert_eq!(
            road_name_from_address("123 Main St, Springfield, IL"),
            "Main St"
        );
        assert_eq!(road_name_from_address("Main St, Springfield"), "Main St");
        // Only fully numeric leading words are house numbers.
        assert_eq!(
            road_name_from_address("12-14 High Street, York"),
            "12-14 High Street"
        );
        assert_eq!(road_name_from_address("42, Somewhere"), RoadInfo::UNKNOWN_ROAD);
        assert_eq!(road_name_from_address(""), RoadInfo::UNKNOWN_ROAD);
    }

    #[test]
    fn test_road_name_from_place_prefers_display_name() {
        let place = RoadPlace {
            display_name: "Main St".to_string(),
            formatted_address: "123 Other Rd, Springfield".to_string(),
        };
        assert_eq!(road_name_from_place(&place), "Main St");

        let place = RoadPlace {
            display_name: "Springfield Mall".to_string(),
            formatted_address: "080 Commercial Rd, Springfield".to_string(),
        };
        assert_eq!(road_name_from_place(&place), "Commercial Rd");

        let place = RoadPlace {
            display_name: String::new(),
            formatted_address: String::new(),
        };
        assert_eq!(road_name_from_place(&place), RoadInfo::UNKNOWN_ROAD);
    }
}
