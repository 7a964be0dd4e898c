//! Lookup structures over the static stop set.

use std::collections::HashMap;
use std::sync::Arc;

use super::normalize::{first_token, fuzzy_contains, normalize};
use crate::domain::{Stop, StopId};

/// Derived lookup structures over the full stop set.
///
/// Positions are indices into the loaded stop array; they are how the
/// engine refers to stops in raw legs, and they are only meaningful for
/// the dataset this index was built from.
pub struct StopIndex {
    /// Position -> stop, in dataset order.
    stops: Vec<Arc<Stop>>,

    /// Position -> precomputed normalized name, parallel to `stops`.
    normalized_names: Vec<String>,

    /// Display name -> platform ids sharing that name.
    ids_by_name: HashMap<String, Vec<StopId>>,
}

impl StopIndex {
    /// Build the index from the engine's stop snapshot. Called once per
    /// process, right after the timetable loads.
    pub fn build(stops: &[Arc<Stop>]) -> Self {
        let normalized_names = stops.iter().map(|stop| normalize(&stop.name)).collect();

        let mut ids_by_name: HashMap<String, Vec<StopId>> = HashMap::new();
        for stop in stops {
            ids_by_name
                .entry(stop.name.clone())
                .or_default()
                .push(stop.id);
        }

        Self {
            stops: stops.to_vec(),
            normalized_names,
            ids_by_name,
        }
    }

    /// Number of stops in the index.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Whether the index holds no stops.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Translate an engine-reported stop position into its stop.
    pub fn stop_at(&self, position: usize) -> Option<&Arc<Stop>> {
        self.stops.get(position)
    }

    /// All platform ids sharing a display name. One named station can
    /// have several platform ids, and routing queries want the full set.
    pub fn stop_ids_for_name(&self, name: &str) -> Vec<StopId> {
        self.ids_by_name.get(name).cloned().unwrap_or_default()
    }

    /// Free-text stop search.
    ///
    /// Two stages: a cheap substring prefilter on the first query token
    /// narrows the candidates, then the full fuzzy match runs on those
    /// candidates only. The full match is noticeably more expensive than
    /// substring containment and the stop set has thousands of entries,
    /// so stage one pays for itself.
    ///
    /// Results are ranked prefix matches first, then by display name.
    pub fn search_by_name(&self, query: &str) -> Vec<Arc<Stop>> {
        let normalized_query = normalize(query);
        if normalized_query.is_empty() {
            return Vec::new();
        }
        let prefilter = first_token(&normalized_query);

        let mut matches: Vec<(bool, &Arc<Stop>)> = self
            .stops
            .iter()
            .zip(&self.normalized_names)
            .filter(|(_, name)| name.contains(prefilter))
            .filter(|(_, name)| fuzzy_contains(name, &normalized_query))
            .map(|(stop, name)| (name.starts_with(&normalized_query), stop))
            .collect();

        matches.sort_by(|(a_prefix, a), (b_prefix, b)| {
            b_prefix.cmp(a_prefix).then_with(|| a.name.cmp(&b.name))
        });

        matches.into_iter().map(|(_, stop)| stop.clone()).collect()
    }

    /// Closest stops to a point, deduplicated by name.
    ///
    /// Distance is planar Euclidean over degrees; at city scale the
    /// error against geodesic distance is irrelevant for ranking.
    /// Different platforms sharing a name count as one candidate, the
    /// closest platform winning.
    pub fn find_nearest(&self, latitude: f64, longitude: f64, limit: usize) -> Vec<Arc<Stop>> {
        let mut by_distance: Vec<(f64, &Arc<Stop>)> = self
            .stops
            .iter()
            .map(|stop| {
                let dlat = stop.latitude - latitude;
                let dlon = stop.longitude - longitude;
                (dlat * dlat + dlon * dlon, stop)
            })
            .collect();

        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut seen_names: Vec<&str> = Vec::new();
        let mut nearest = Vec::new();
        for (_, stop) in by_distance {
            if seen_names.contains(&stop.name.as_str()) {
                continue;
            }
            seen_names.push(&stop.name);
            nearest.push(stop.clone());
            if nearest.len() == limit {
                break;
            }
        }

        nearest
    }
}
