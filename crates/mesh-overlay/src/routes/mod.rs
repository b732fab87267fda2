// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Traceroute cache and derived path geometry.
//!
//! The whole collection is replaced on every poll. For each surviving route
//! the store resolves the path against current node positions and assigns a
//! hop bucket color. Routes that resolve to fewer than two coordinates are
//! dropped silently; duplicates between the same pair are all kept.

use log::debug;

use crate::geo::LatLon;
use crate::model::Route;
use crate::registry::NodeRegistry;

/// Hop counts above this share the last color bucket.
pub const MAX_HOPS: u32 = 7;

// Green (direct) through red (long multi-hop)
const HOP_PALETTE: [&str; MAX_HOPS as usize + 1] = [
    "#00e676", "#76ff03", "#c6ff00", "#ffea00", "#ffc400", "#ff9100", "#ff3d00", "#d50000",
];

/// Clamp a hop count into its color bucket.
#[must_use]
pub fn hop_bucket(hop_count: u32) -> u32 {
    hop_count.min(MAX_HOPS)
}

/// Color for a hop count. Pure function of `min(hop_count, MAX_HOPS)`.
#[must_use]
pub fn hop_color(hop_count: u32) -> &'static str {
    HOP_PALETTE[hop_bucket(hop_count) as usize]
}

/// Tooltip text: `"1 hop"`, `"3 hops"`.
#[must_use]
pub fn hop_label(hop_count: u32) -> String {
    if hop_count == 1 {
        "1 hop".to_string()
    } else {
        format!("{hop_count} hops")
    }
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub bucket: u32,
    pub label: String,
    pub color: &'static str,
}

/// Legend rows for every bucket, the last one open-ended.
#[must_use]
pub fn legend() -> Vec<LegendEntry> {
    (0..=MAX_HOPS)
        .map(|bucket| LegendEntry {
            bucket,
            label: if bucket == MAX_HOPS {
                format!("{MAX_HOPS}+ hops")
            } else {
                hop_label(bucket)
            },
            color: hop_color(bucket),
        })
        .collect()
}

/// A route with its resolved geometry, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PlottedRoute {
    pub route: Route,
    /// Coordinates of path nodes that currently have a position.
    pub geometry: Vec<LatLon>,
    /// Node ids matching `geometry`, index for index.
    pub resolved_ids: Vec<String>,
    pub bucket: u32,
    pub color: &'static str,
}

impl PlottedRoute {
    /// Resolve a route against current node positions.
    ///
    /// Returns `None` when fewer than two path nodes have a position.
    #[must_use]
    pub fn resolve(route: Route, nodes: &NodeRegistry) -> Option<Self> {
        let (resolved_ids, geometry): (Vec<String>, Vec<LatLon>) = route
            .full_path()
            .into_iter()
            .filter_map(|id| nodes.position_of(id).map(|pos| (id.to_string(), pos)))
            .unzip();

        if geometry.len() < 2 {
            return None;
        }

        let bucket = hop_bucket(route.hop_count);
        Some(Self {
            color: hop_color(route.hop_count),
            bucket,
            route,
            geometry,
            resolved_ids,
        })
    }
}

/// Owner of the current traceroute collection.
#[derive(Debug, Default)]
pub struct RouteStore {
    /// Last fetched batch, unfiltered.
    fetched: Vec<Route>,
    plotted: Vec<PlottedRoute>,
}

impl RouteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the collection with a freshly fetched batch.
    ///
    /// With a node filter set only routes whose full path contains that node
    /// survive.
    pub fn reconcile(
        &mut self,
        fetched: Vec<Route>,
        node_filter: Option<&str>,
        nodes: &NodeRegistry,
    ) -> &[PlottedRoute] {
        self.fetched = fetched;
        self.refilter(node_filter, nodes)
    }

    /// Re-derive the plotted set from the last batch, e.g. after the node
    /// filter changed.
    pub fn refilter(&mut self, node_filter: Option<&str>, nodes: &NodeRegistry) -> &[PlottedRoute] {
        let total = self.fetched.len();
        self.plotted = self
            .fetched
            .iter()
            .filter(|route| node_filter.map_or(true, |id| route.passes_through(id)))
            .filter_map(|route| PlottedRoute::resolve(route.clone(), nodes))
            .collect();
        debug!(
            "Route store: {} fetched, {} plottable (filter: {:?})",
            total,
            self.plotted.len(),
            node_filter
        );
        &self.plotted
    }

    /// Forget everything, as after a failed fetch.
    pub fn clear(&mut self) {
        self.fetched.clear();
        self.plotted.clear();
    }

    #[must_use]
    pub fn plotted(&self) -> &[PlottedRoute] {
        &self.plotted
    }

    #[must_use]
    pub fn fetched(&self) -> &[Route] {
        &self.fetched
    }
}

/// One row of the traceroute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerouteRow {
    /// `"name (id)"` of the destination.
    pub destination: String,
    pub hop_count: u32,
    /// Intermediate hops by display name, joined with `→`. Empty when direct.
    pub path: String,
}

/// Traceroutes sharing a source node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerouteGroup {
    pub source_id: String,
    /// `"name (id)"` of the source.
    pub heading: String,
    pub rows: Vec<TracerouteRow>,
}

fn labelled(nodes: &NodeRegistry, id: &str) -> String {
    format!("{} ({})", nodes.display_name(id), id)
}

/// Group a batch by source node for the list view.
///
/// Groups appear in the order their source is first met in `routes`, rows
/// keep batch order.
#[must_use]
pub fn group_by_source(routes: &[Route], nodes: &NodeRegistry) -> Vec<TracerouteGroup> {
    let mut groups: Vec<TracerouteGroup> = Vec::new();
    for route in routes {
        let row = TracerouteRow {
            destination: labelled(nodes, &route.dest_id),
            hop_count: route.hop_count,
            path: route
                .hops
                .iter()
                .map(|id| nodes.display_name(id))
                .collect::<Vec<_>>()
                .join(" → "),
        };
        match groups.iter_mut().find(|g| g.source_id == route.source_id) {
            Some(group) => group.rows.push(row),
            None => groups.push(TracerouteGroup {
                source_id: route.source_id.clone(),
                heading: labelled(nodes, &route.source_id),
                rows: vec![row],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Transport};
    use chrono::DateTime;

    fn registry(nodes: &[(&str, Option<(f64, f64)>)]) -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.reconcile(
            nodes
                .iter()
                .map(|(id, pos)| {
                    let mut n = Node::new((*id).to_string(), None, None, None);
                    n.position = pos.map(|(lat, lon)| LatLon::new(lat, lon));
                    n
                })
                .collect(),
        );
        registry
    }

    fn route(src: &str, hops: &[&str], dest: &str, hop_count: u32) -> Route {
        Route {
            source_id: src.to_string(),
            dest_id: dest.to_string(),
            hop_count,
            hops: hops.iter().map(ToString::to_string).collect(),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            transport: Transport::Radio,
            radio_metrics: None,
        }
    }

    #[test]
    fn test_hop_color_is_stable_and_clamped() {
        assert_eq!(hop_color(1), hop_color(1));
        assert_eq!(hop_color(7), hop_color(12));
        assert_eq!(hop_color(u32::MAX), hop_color(MAX_HOPS));
        assert_ne!(hop_color(1), hop_color(2));
        assert_eq!(hop_bucket(9), 7);
    }

    #[test]
    fn test_hop_label() {
        assert_eq!(hop_label(1), "1 hop");
        assert_eq!(hop_label(0), "0 hops");
        assert_eq!(hop_label(4), "4 hops");
    }

    #[test]
    fn test_legend_covers_all_buckets() {
        let entries = legend();
        assert_eq!(entries.len(), 8);
        assert_eq!(entries[1].label, "1 hop");
        assert_eq!(entries[7].label, "7+ hops");
        assert_eq!(entries[3].color, hop_color(3));
    }

    #[test]
    fn test_two_point_route() {
        let nodes = registry(&[("A", Some((0.0, 0.0))), ("B", Some((0.0, 1.0)))]);
        let mut store = RouteStore::new();
        let plotted = store.reconcile(vec![route("A", &[], "B", 1)], None, &nodes);

        assert_eq!(plotted.len(), 1);
        assert_eq!(
            plotted[0].geometry,
            vec![LatLon::new(0.0, 0.0), LatLon::new(0.0, 1.0)]
        );
        assert_eq!(plotted[0].color, hop_color(1));
    }

    #[test]
    fn test_unpositioned_hops_are_skipped() {
        let nodes = registry(&[
            ("A", Some((0.0, 0.0))),
            ("C", None),
            ("B", Some((0.0, 1.0))),
        ]);
        let mut store = RouteStore::new();
        let plotted = store.reconcile(vec![route("A", &["C", "X"], "B", 3)], None, &nodes);

        assert_eq!(plotted[0].geometry.len(), 2);
        assert_eq!(plotted[0].resolved_ids, vec!["A", "B"]);
    }

    #[test]
    fn test_short_geometry_dropped() {
        let nodes = registry(&[("A", Some((0.0, 0.0))), ("B", None)]);
        let mut store = RouteStore::new();
        let plotted = store.reconcile(vec![route("A", &[], "B", 1)], None, &nodes);
        assert!(plotted.is_empty());
        assert_eq!(store.fetched().len(), 1);
    }

    #[test]
    fn test_duplicates_kept() {
        let nodes = registry(&[("A", Some((0.0, 0.0))), ("B", Some((0.0, 1.0)))]);
        let mut store = RouteStore::new();
        let plotted = store.reconcile(
            vec![route("A", &[], "B", 1), route("A", &[], "B", 1)],
            None,
            &nodes,
        );
        assert_eq!(plotted.len(), 2);
    }

    #[test]
    fn test_filter_is_subset_containing_node() {
        let nodes = registry(&[
            ("A", Some((0.0, 0.0))),
            ("B", Some((0.0, 1.0))),
            ("C", Some((1.0, 0.0))),
            ("D", Some((1.0, 1.0))),
        ]);
        let batch = vec![
            route("A", &[], "B", 1),
            route("A", &["C"], "D", 2),
            route("C", &[], "D", 1),
            route("D", &["B"], "A", 2),
        ];
        let mut store = RouteStore::new();
        let unfiltered: Vec<PlottedRoute> = store.reconcile(batch.clone(), None, &nodes).to_vec();
        let filtered: Vec<PlottedRoute> = store.reconcile(batch, Some("B"), &nodes).to_vec();

        let expected: Vec<PlottedRoute> = unfiltered
            .into_iter()
            .filter(|p| p.route.full_path().contains(&"B"))
            .collect();
        assert_eq!(filtered, expected);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_refilter_uses_last_batch() {
        let nodes = registry(&[("A", Some((0.0, 0.0))), ("B", Some((0.0, 1.0))), ("C", Some((1.0, 0.0)))]);
        let mut store = RouteStore::new();
        store.reconcile(vec![route("A", &[], "B", 1), route("A", &[], "C", 1)], None, &nodes);

        assert_eq!(store.refilter(Some("C"), &nodes).len(), 1);
        assert_eq!(store.refilter(None, &nodes).len(), 2);
    }

    #[test]
    fn test_group_by_source() {
        let mut nodes = NodeRegistry::new();
        nodes.reconcile(vec![
            Node::new("A".to_string(), None, Some("Alpha"), None),
            Node::new("C".to_string(), Some("Relay"), None, None),
        ]);
        let batch = vec![
            route("A", &["C", "X"], "B", 3),
            route("B", &[], "A", 1),
            route("A", &[], "C", 1),
        ];

        let groups = group_by_source(&batch, &nodes);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].heading, "Alpha (A)");
        assert_eq!(groups[0].rows.len(), 2);
        assert_eq!(groups[0].rows[0].destination, "B (B)");
        assert_eq!(groups[0].rows[0].hop_count, 3);
        assert_eq!(groups[0].rows[0].path, "Relay → X");
        assert_eq!(groups[0].rows[1].destination, "Relay (C)");
        assert!(groups[0].rows[1].path.is_empty());
        assert_eq!(groups[1].source_id, "B");
        assert_eq!(groups[1].rows[0].destination, "Alpha (A)");
    }
}
