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

//! Map overlay renderer.
//!
//! [`MapOverlayRenderer`] is the only component that mutates the map's visual
//! objects. It keeps one marker per positioned node, one polyline plus vertex
//! markers per rendered route, and applies highlight transitions, global
//! route visibility and label visibility incrementally.
//!
//! The invariant that matters most: when a node moves, every rendered route
//! passing through it is destroyed *before* the node's marker is relocated,
//! so no frame ever shows a route using the node's stale coordinate.

mod popup;
mod scene;

pub use popup::{NodePopup, PathStep, Popup, RouteInfo};
pub use scene::{Layer, LayerId, MapSurface, Owner, Scene, Shape, Style};

use std::collections::HashMap;

use log::debug;

use crate::geo::LatLon;
use crate::highlight::{HighlightController, HighlightState, RouteHandle, Transition};
use crate::model::{Node, RouteKey};
use crate::registry::{NodeEvent, NodeRegistry};
use crate::routes::{hop_label, legend, LegendEntry, PlottedRoute};

/// Focused route style.
pub const HIGHLIGHT_STYLE: Style = Style {
    color: "#00ffff",
    weight: 4.0,
};
const ROUTE_WEIGHT: f32 = 2.0;
const VERTEX_RADIUS: f32 = 4.0;
const NODE_MARKER_STYLE: Style = Style {
    color: "#2979ff",
    weight: 1.0,
};

#[derive(Debug)]
struct RenderedRoute {
    handle: RouteHandle,
    line: LayerId,
    vertices: Vec<LayerId>,
    plotted: PlottedRoute,
    info: RouteInfo,
}

impl RenderedRoute {
    fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        std::iter::once(self.line).chain(self.vertices.iter().copied())
    }

    fn own_style(&self) -> Style {
        Style {
            color: self.plotted.color,
            weight: ROUTE_WEIGHT,
        }
    }
}

/// Owner of every visual object on the map.
#[derive(Debug)]
pub struct MapOverlayRenderer<S: MapSurface = Scene> {
    surface: S,
    next_layer: u64,
    next_route: u64,
    node_markers: HashMap<String, LayerId>,
    routes: Vec<RenderedRoute>,
    routes_visible: bool,
    labels_visible: bool,
    node_route_filter: Option<String>,
    highlight: HighlightController,
    popup: Option<Popup>,
}

impl Default for MapOverlayRenderer<Scene> {
    fn default() -> Self {
        Self::new(Scene::new())
    }
}

impl<S: MapSurface> MapOverlayRenderer<S> {
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            next_layer: 0,
            next_route: 0,
            node_markers: HashMap::new(),
            routes: Vec::new(),
            routes_visible: true,
            labels_visible: true,
            node_route_filter: None,
            highlight: HighlightController::new(),
            popup: None,
        }
    }

    fn alloc_layer(&mut self) -> LayerId {
        self.next_layer += 1;
        LayerId(self.next_layer)
    }

    fn alloc_route(&mut self) -> RouteHandle {
        self.next_route += 1;
        RouteHandle(self.next_route)
    }

    // --- nodes ---------------------------------------------------------

    /// Create or update the marker for a node.
    ///
    /// On a `Moved` event the routes through the node are invalidated first,
    /// then the existing marker is relocated in place.
    pub fn upsert_node_marker(&mut self, node: &Node, event: Option<&NodeEvent>) {
        if let Some(NodeEvent::Moved { node_id, .. }) = event {
            self.invalidate_routes_for(node_id);
        }

        match (self.node_markers.get(&node.id).copied(), node.position) {
            (None, Some(position)) => {
                let id = self.alloc_layer();
                let mut layer = Layer::new(
                    Shape::Marker {
                        position,
                        label: node.short_label.clone(),
                    },
                    NODE_MARKER_STYLE,
                    Owner::Node(node.id.clone()),
                )
                .attached(true);
                layer.label_visible = self.labels_visible;
                self.surface.insert(id, layer);
                self.node_markers.insert(node.id.clone(), id);
            }
            (Some(id), Some(position)) => {
                self.surface.set_position(id, position);
                self.surface.set_label(id, &node.short_label);
                self.surface.set_attached(id, true);
            }
            (Some(id), None) => {
                self.surface.set_attached(id, false);
            }
            (None, None) => {}
        }

        let filter_checked = self.node_route_filter.as_deref() == Some(node.id.as_str());
        if let Some(Popup::Node { anchor, content }) = &mut self.popup {
            if content.node_id == node.id {
                *content = NodePopup::new(node, filter_checked);
                if let Some(position) = node.position {
                    *anchor = position;
                }
            }
        }
    }

    /// Destroy every rendered route whose full path contains `node_id`.
    ///
    /// Returns how many routes were removed.
    pub fn invalidate_routes_for(&mut self, node_id: &str) -> usize {
        let focused = self.highlight.focused();
        let (stale, keep): (Vec<RenderedRoute>, Vec<RenderedRoute>) = std::mem::take(&mut self.routes)
            .into_iter()
            .partition(|r| r.plotted.route.passes_through(node_id));
        self.routes = keep;

        for route in &stale {
            for layer in route.layers() {
                self.surface.remove(layer);
            }
        }

        if focused.is_some_and(|h| stale.iter().any(|r| r.handle == h)) {
            self.highlight.reset();
            self.close_route_popup();
            self.restore_all();
        }

        if !stale.is_empty() {
            debug!("Invalidated {} routes through {}", stale.len(), node_id);
        }
        stale.len()
    }

    /// Toggle the short label inside node markers.
    pub fn set_labels_visible(&mut self, visible: bool) {
        self.labels_visible = visible;
        for id in self.node_markers.values() {
            self.surface.set_label_visible(*id, visible);
        }
    }

    // --- routes --------------------------------------------------------

    /// Replace every rendered route with `plotted`.
    ///
    /// Visuals are attached only while routes are globally visible. If the
    /// previously focused route is part of the new set it stays focused.
    pub fn rebuild_routes(&mut self, plotted: &[PlottedRoute], nodes: &NodeRegistry) {
        let focused_key: Option<RouteKey> = self
            .highlight
            .focused()
            .and_then(|h| self.route(h))
            .map(|r| r.plotted.route.key());

        for route in std::mem::take(&mut self.routes) {
            for layer in route.layers() {
                self.surface.remove(layer);
            }
        }
        self.highlight.reset();

        for p in plotted {
            let handle = self.alloc_route();
            let style = Style {
                color: p.color,
                weight: ROUTE_WEIGHT,
            };

            let line = self.alloc_layer();
            self.surface.insert(
                line,
                Layer::new(
                    Shape::Polyline {
                        points: p.geometry.clone(),
                    },
                    style,
                    Owner::RouteLine(handle),
                )
                .with_tooltip(hop_label(p.route.hop_count))
                .attached(self.routes_visible),
            );

            let mut vertices = Vec::with_capacity(p.geometry.len());
            for position in &p.geometry {
                let id = self.alloc_layer();
                self.surface.insert(
                    id,
                    Layer::new(
                        Shape::Vertex {
                            position: *position,
                            radius: VERTEX_RADIUS,
                        },
                        style,
                        Owner::RouteVertex(handle),
                    )
                    .attached(self.routes_visible),
                );
                vertices.push(id);
            }

            self.routes.push(RenderedRoute {
                handle,
                line,
                vertices,
                plotted: p.clone(),
                info: RouteInfo::build(p, nodes),
            });
        }

        let refocus = focused_key.and_then(|key| {
            self.routes
                .iter()
                .find(|r| r.plotted.route.key() == key)
                .map(|r| r.handle)
        });

        match refocus {
            Some(handle) if self.routes_visible => {
                self.highlight.focus(handle);
                self.apply_focus(handle);
                let info = self.route(handle).map(|r| r.info.clone());
                if let (Some(Popup::Route { handle: h, info: i, .. }), Some(info)) =
                    (&mut self.popup, info)
                {
                    *h = handle;
                    *i = info;
                }
            }
            _ => self.close_route_popup(),
        }

        debug!("Rebuilt {} routes", self.routes.len());
    }

    /// Show or hide every rendered route without discarding it.
    ///
    /// Hiding resets any focus to `Idle`.
    pub fn set_global_visibility(&mut self, visible: bool) {
        if visible == self.routes_visible {
            return;
        }
        self.routes_visible = visible;

        if visible {
            self.restore_all();
        } else {
            self.highlight.reset();
            self.close_route_popup();
            for route in &self.routes {
                for layer in route.layers() {
                    self.surface.set_attached(layer, false);
                }
            }
        }
    }

    /// Route click entry point, delegating to the highlight state machine.
    pub fn click_route(&mut self, handle: RouteHandle, at: LatLon) -> Transition {
        if self.route(handle).is_none() {
            return Transition::Ignored;
        }

        let transition = self.highlight.click(handle, self.routes_visible);
        match transition {
            Transition::Ignored => {}
            Transition::Focus { target, .. } => {
                self.apply_focus(target);
                self.show_info_popup(target, at);
            }
            Transition::Release { .. } => {
                self.restore_all();
                self.close_route_popup();
            }
        }
        transition
    }

    fn apply_focus(&mut self, target: RouteHandle) {
        for route in &self.routes {
            if route.handle == target {
                for layer in route.layers() {
                    self.surface.set_style(layer, HIGHLIGHT_STYLE);
                    self.surface.set_attached(layer, true);
                    self.surface.bring_to_front(layer);
                }
            } else {
                for layer in route.layers() {
                    self.surface.set_attached(layer, false);
                }
            }
        }
    }

    fn restore_all(&mut self) {
        for route in &self.routes {
            let style = route.own_style();
            for layer in route.layers() {
                self.surface.set_style(layer, style);
                self.surface.set_attached(layer, self.routes_visible);
            }
        }
    }

    // --- popups --------------------------------------------------------

    /// Open the info popup for a rendered route at the click position.
    pub fn show_info_popup(&mut self, handle: RouteHandle, at: LatLon) {
        if let Some(route) = self.route(handle) {
            self.popup = Some(Popup::Route {
                handle,
                anchor: at,
                info: route.info.clone(),
            });
        }
    }

    /// Open the popup of a node marker.
    pub fn open_node_popup(&mut self, node: &Node) {
        if let Some(position) = node.position {
            let checked = self.node_route_filter.as_deref() == Some(node.id.as_str());
            self.popup = Some(Popup::Node {
                anchor: position,
                content: NodePopup::new(node, checked),
            });
        }
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    fn close_route_popup(&mut self) {
        if matches!(self.popup, Some(Popup::Route { .. })) {
            self.popup = None;
        }
    }

    // --- filter --------------------------------------------------------

    pub fn set_node_route_filter(&mut self, filter: Option<String>) {
        self.node_route_filter = filter;
        if let Some(Popup::Node { content, .. }) = &mut self.popup {
            content.routes_filter_checked =
                self.node_route_filter.as_deref() == Some(content.node_id.as_str());
        }
    }

    // --- accessors -----------------------------------------------------

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub fn node_route_filter(&self) -> Option<&str> {
        self.node_route_filter.as_deref()
    }

    #[must_use]
    pub fn routes_visible(&self) -> bool {
        self.routes_visible
    }

    #[must_use]
    pub fn labels_visible(&self) -> bool {
        self.labels_visible
    }

    #[must_use]
    pub fn highlight_state(&self) -> HighlightState {
        self.highlight.state()
    }

    #[must_use]
    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    #[must_use]
    pub fn legend(&self) -> Vec<LegendEntry> {
        legend()
    }

    #[must_use]
    pub fn node_marker(&self, node_id: &str) -> Option<LayerId> {
        self.node_markers.get(node_id).copied()
    }

    fn route(&self, handle: RouteHandle) -> Option<&RenderedRoute> {
        self.routes.iter().find(|r| r.handle == handle)
    }

    /// Handles of all rendered routes, in creation order.
    #[must_use]
    pub fn route_handles(&self) -> Vec<RouteHandle> {
        self.routes.iter().map(|r| r.handle).collect()
    }

    #[must_use]
    pub fn plotted_route(&self, handle: RouteHandle) -> Option<&PlottedRoute> {
        self.route(handle).map(|r| &r.plotted)
    }

    #[must_use]
    pub fn route_info(&self, handle: RouteHandle) -> Option<&RouteInfo> {
        self.route(handle).map(|r| &r.info)
    }

    /// Routes whose line is currently attached to the map.
    #[must_use]
    pub fn visible_routes(&self) -> Vec<RouteHandle> {
        self.routes
            .iter()
            .filter(|r| self.surface.layer(r.line).is_some_and(|l| l.attached))
            .map(|r| r.handle)
            .collect()
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}
