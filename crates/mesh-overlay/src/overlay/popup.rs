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

//! Popup content for nodes and routes.

use chrono::{DateTime, Local, Utc};

use crate::geo::{distance_km, format_km, path_length_km, LatLon};
use crate::highlight::RouteHandle;
use crate::model::{Node, RadioMetrics, Transport};
use crate::registry::NodeRegistry;
use crate::routes::{hop_label, PlottedRoute};

fn format_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Content of a node marker popup.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePopup {
    pub node_id: String,
    pub display_name: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub altitude: Option<f64>,
    /// State of the "show routes for this node" checkbox.
    pub routes_filter_checked: bool,
}

impl NodePopup {
    #[must_use]
    pub fn new(node: &Node, routes_filter_checked: bool) -> Self {
        Self {
            node_id: node.id.clone(),
            display_name: node.display_name.clone(),
            last_seen: node.last_seen_at,
            altitude: node.altitude,
            routes_filter_checked,
        }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.display_name.clone(),
            format!("ID: {}", self.node_id),
            format!(
                "Last seen: {}",
                self.last_seen.map(format_time).unwrap_or_default()
            ),
        ];
        if let Some(alt) = self.altitude {
            lines.push(format!("Alt: {alt} m"));
        }
        lines
    }
}

/// One node on a route path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    pub node_id: String,
    pub name: String,
    /// Distance from the previous step, when both ends have a position.
    pub leg_km: Option<f64>,
}

/// Metadata attached to a rendered route for its info popup.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInfo {
    pub source_name: String,
    pub dest_name: String,
    pub hop_count: u32,
    pub timestamp: DateTime<Utc>,
    pub transport: Transport,
    /// Only kept for radio transport.
    pub radio_metrics: Option<RadioMetrics>,
    /// Length of the drawn geometry.
    pub total_km: f64,
    pub path: Vec<PathStep>,
}

impl RouteInfo {
    #[must_use]
    pub fn build(plotted: &PlottedRoute, nodes: &NodeRegistry) -> Self {
        let route = &plotted.route;

        let mut previous: Option<LatLon> = None;
        let path = route
            .full_path()
            .into_iter()
            .map(|id| {
                let position = nodes.position_of(id);
                let leg_km = match (previous, position) {
                    (Some(a), Some(b)) => Some(distance_km(a, b)),
                    _ => None,
                };
                previous = position;
                PathStep {
                    node_id: id.to_string(),
                    name: nodes.display_name(id).to_string(),
                    leg_km,
                }
            })
            .collect();

        Self {
            source_name: nodes.display_name(&route.source_id).to_string(),
            dest_name: nodes.display_name(&route.dest_id).to_string(),
            hop_count: route.hop_count,
            timestamp: route.timestamp,
            transport: route.transport,
            radio_metrics: match route.transport {
                Transport::Radio => route.radio_metrics.clone(),
                Transport::Relay => None,
            },
            total_km: path_length_km(&plotted.geometry),
            path,
        }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{} → {}", self.source_name, self.dest_name),
            format!("{} · {}", hop_label(self.hop_count), format_time(self.timestamp)),
            format!("Via: {}", self.transport.label()),
        ];
        if let Some(metrics) = &self.radio_metrics {
            for (name, value) in metrics {
                lines.push(format!("{}: {}", name.to_uppercase(), value));
            }
        }
        lines.push(format!("Distance: {}", format_km(self.total_km)));
        lines.push("Path:".to_string());
        for step in &self.path {
            match step.leg_km {
                Some(km) => lines.push(format!("  {} (+{})", step.name, format_km(km))),
                None => lines.push(format!("  {}", step.name)),
            }
        }
        lines
    }
}

/// The single popup open on the map.
#[derive(Debug, Clone, PartialEq)]
pub enum Popup {
    Node { anchor: LatLon, content: NodePopup },
    Route {
        handle: RouteHandle,
        anchor: LatLon,
        info: RouteInfo,
    },
}

impl Popup {
    #[must_use]
    pub fn anchor(&self) -> LatLon {
        match self {
            Popup::Node { anchor, .. } | Popup::Route { anchor, .. } => *anchor,
        }
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match self {
            Popup::Node { content, .. } => content.lines(),
            Popup::Route { info, .. } => info.lines(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Route;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        let a = Node::new("A".to_string(), None, Some("Alpha"), None)
            .with_position(LatLon::new(0.0, 0.0));
        let c = Node::new("C".to_string(), None, None, None);
        let b = Node::new("B".to_string(), Some("Bravo"), None, None)
            .with_position(LatLon::new(0.0, 1.0));
        registry.reconcile(vec![a, c, b]);
        registry
    }

    fn plotted(transport: Transport) -> PlottedRoute {
        let route = Route {
            source_id: "A".to_string(),
            dest_id: "B".to_string(),
            hop_count: 1,
            hops: vec!["C".to_string()],
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            transport,
            radio_metrics: Some(RadioMetrics::from([("snr".to_string(), 6.5)])),
        };
        PlottedRoute::resolve(route, &registry()).unwrap()
    }

    #[test]
    fn test_route_info_names_and_distances() {
        let info = RouteInfo::build(&plotted(Transport::Radio), &registry());

        assert_eq!(info.source_name, "Alpha");
        assert_eq!(info.dest_name, "Bravo");
        assert!((info.total_km - 111.19).abs() < 0.1);
        assert_eq!(info.path.len(), 3);
        assert_eq!(info.path[1].name, "C");
        assert_eq!(info.path[1].leg_km, None);
        // Unpositioned hop breaks the leg chain
        assert_eq!(info.path[2].leg_km, None);
        assert_eq!(info.path[0].leg_km, None);
    }

    #[test]
    fn test_metrics_only_for_radio() {
        let radio = RouteInfo::build(&plotted(Transport::Radio), &registry());
        let relay = RouteInfo::build(&plotted(Transport::Relay), &registry());

        assert!(radio.lines().iter().any(|l| l == "SNR: 6.5"));
        assert!(relay.radio_metrics.is_none());
        assert!(relay.lines().iter().any(|l| l == "Via: MQTT"));
    }

    #[test]
    fn test_node_popup_lines() {
        let mut node = Node::new("!a1".to_string(), None, Some("Alpha"), None);
        node.altitude = Some(120.0);
        let popup = NodePopup::new(&node, true);
        let lines = popup.lines();

        assert_eq!(lines[0], "Alpha");
        assert_eq!(lines[1], "ID: !a1");
        assert_eq!(lines[2], "Last seen: ");
        assert_eq!(lines[3], "Alt: 120 m");
        assert!(popup.routes_filter_checked);
    }
}
