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

//! Node identity and position cache.
//!
//! The registry keeps the last known state of every node the backend has ever
//! reported. Nodes are updated in place on each poll and are never removed:
//! absence from a batch is not treated as deletion.

use std::collections::HashMap;

use log::debug;

use crate::geo::LatLon;
use crate::model::Node;

/// Changes reported by [`NodeRegistry::reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// First poll that reported this id.
    Created(String),
    /// Position differs from the previous poll (exact comparison).
    Moved {
        node_id: String,
        from: Option<LatLon>,
        to: Option<LatLon>,
    },
}

impl NodeEvent {
    #[must_use]
    pub fn node_id(&self) -> &str {
        match self {
            NodeEvent::Created(id) | NodeEvent::Moved { node_id: id, .. } => id,
        }
    }
}

/// Cache of node identity and position.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Node>,
    /// Insertion order, so "first node with a position" is stable.
    order: Vec<String>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched batch into the registry.
    ///
    /// Events are returned in batch order. Nodes missing from the batch keep
    /// their last known state.
    pub fn reconcile(&mut self, fetched: Vec<Node>) -> Vec<NodeEvent> {
        let mut events = Vec::new();

        for node in fetched {
            match self.nodes.get_mut(&node.id) {
                None => {
                    debug!("Node {} created", node.id);
                    events.push(NodeEvent::Created(node.id.clone()));
                    self.order.push(node.id.clone());
                    self.nodes.insert(node.id.clone(), node);
                }
                Some(existing) => {
                    if existing.position != node.position {
                        debug!(
                            "Node {} moved {:?} -> {:?}",
                            node.id, existing.position, node.position
                        );
                        events.push(NodeEvent::Moved {
                            node_id: node.id.clone(),
                            from: existing.position,
                            to: node.position,
                        });
                    }
                    *existing = node;
                }
            }
        }

        events
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn position_of(&self, id: &str) -> Option<LatLon> {
        self.nodes.get(id).and_then(|n| n.position)
    }

    /// Display name for an id, falling back to the id itself.
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.nodes.get(id).map_or(id, |n| n.display_name.as_str())
    }

    /// Nodes in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, pos: Option<(f64, f64)>) -> Node {
        let mut n = Node::new(id.to_string(), None, None, None);
        n.position = pos.map(|(lat, lon)| LatLon::new(lat, lon));
        n
    }

    #[test]
    fn test_first_sight_creates() {
        let mut registry = NodeRegistry::new();
        let events = registry.reconcile(vec![node("A", Some((0.0, 0.0))), node("B", None)]);

        assert_eq!(
            events,
            vec![
                NodeEvent::Created("A".to_string()),
                NodeEvent::Created("B".to_string())
            ]
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unchanged_position_no_event() {
        let mut registry = NodeRegistry::new();
        registry.reconcile(vec![node("A", Some((0.0, 0.0)))]);

        let mut renamed = node("A", Some((0.0, 0.0)));
        renamed.display_name = "Alpha".to_string();
        let events = registry.reconcile(vec![renamed]);

        assert!(events.is_empty());
        assert_eq!(registry.display_name("A"), "Alpha");
    }

    #[test]
    fn test_position_change_reports_move() {
        let mut registry = NodeRegistry::new();
        registry.reconcile(vec![node("A", Some((0.0, 0.0)))]);
        let events = registry.reconcile(vec![node("A", Some((1.0, 1.0)))]);

        assert_eq!(
            events,
            vec![NodeEvent::Moved {
                node_id: "A".to_string(),
                from: Some(LatLon::new(0.0, 0.0)),
                to: Some(LatLon::new(1.0, 1.0)),
            }]
        );
        assert_eq!(registry.position_of("A"), Some(LatLon::new(1.0, 1.0)));
    }

    #[test]
    fn test_tiny_change_is_still_a_move() {
        let mut registry = NodeRegistry::new();
        registry.reconcile(vec![node("A", Some((45.0, 9.0)))]);
        let events = registry.reconcile(vec![node("A", Some((45.0, 9.000_000_1)))]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_gaining_a_fix_is_a_move() {
        let mut registry = NodeRegistry::new();
        registry.reconcile(vec![node("A", None)]);
        let events = registry.reconcile(vec![node("A", Some((1.0, 2.0)))]);
        assert!(matches!(events[0], NodeEvent::Moved { from: None, .. }));
    }

    #[test]
    fn test_absent_nodes_are_kept() {
        let mut registry = NodeRegistry::new();
        registry.reconcile(vec![node("A", Some((0.0, 0.0))), node("B", Some((0.0, 1.0)))]);
        let events = registry.reconcile(vec![node("A", Some((0.0, 0.0)))]);

        assert!(events.is_empty());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.position_of("B"), Some(LatLon::new(0.0, 1.0)));
    }

    #[test]
    fn test_iter_preserves_first_seen_order() {
        let mut registry = NodeRegistry::new();
        registry.reconcile(vec![node("C", None), node("A", None)]);
        registry.reconcile(vec![node("B", None), node("C", None)]);
        let ids: Vec<&str> = registry.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }
}
