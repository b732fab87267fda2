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

//! Map canvas: basemap tiles, the overlay scene, pan/zoom and hit-testing.

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke};
use mesh_overlay::{Dashboard, Layer, LatLon, Owner, RouteHandle, Scene, Shape, ViewportRequest};

use super::{overlay_color, popup, UiAction};
use crate::map::tiles::visible_tiles;
use crate::map::{TileManager, Viewport};

const MARKER_RADIUS: f32 = 9.0;
const HIT_SLOP: f32 = 4.0;
const BACKGROUND: Color32 = Color32::from_rgb(20, 22, 28);

/// Clicked map object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    Node(String),
    Route(RouteHandle),
}

/// Distance from `p` to the segment `a`-`b`, in screen pixels.
pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn is_marker(layer: &Layer) -> bool {
    matches!(layer.shape, Shape::Marker { .. })
}

/// Attached layers in paint order. Node markers sit above every route
/// layer regardless of z.
fn paint_order(scene: &Scene) -> Vec<&Layer> {
    let layers = scene.attached_layers();
    let (markers, shapes): (Vec<&Layer>, Vec<&Layer>) =
        layers.into_iter().map(|(_, l)| l).partition(|l| is_marker(l));
    shapes.into_iter().chain(markers).collect()
}

fn layer_hit(layer: &Layer, viewport: &Viewport, rect: Rect, pos: Pos2) -> bool {
    match &layer.shape {
        Shape::Marker { position, .. } => {
            viewport.project(*position, rect).distance(pos) <= MARKER_RADIUS + HIT_SLOP
        }
        Shape::Vertex { position, radius } => {
            viewport.project(*position, rect).distance(pos) <= radius + HIT_SLOP
        }
        Shape::Polyline { points } => {
            let screen: Vec<Pos2> = points.iter().map(|p| viewport.project(*p, rect)).collect();
            screen
                .windows(2)
                .any(|w| distance_to_segment(pos, w[0], w[1]) <= layer.style.weight / 2.0 + HIT_SLOP)
        }
    }
}

fn topmost<'a>(scene: &'a Scene, viewport: &Viewport, rect: Rect, pos: Pos2) -> Option<&'a Layer> {
    paint_order(scene)
        .into_iter()
        .rev()
        .find(|layer| layer_hit(layer, viewport, rect, pos))
}

/// Topmost attached object under `pos`.
pub fn hit_test(scene: &Scene, viewport: &Viewport, rect: Rect, pos: Pos2) -> Option<Pick> {
    topmost(scene, viewport, rect, pos).map(|layer| match &layer.owner {
        Owner::Node(id) => Pick::Node(id.clone()),
        Owner::RouteLine(handle) | Owner::RouteVertex(handle) => Pick::Route(*handle),
    })
}

/// Map widget owning the camera and the basemap.
#[derive(Debug, Default)]
pub struct MapView {
    viewport: Viewport,
    tiles: TileManager,
}

impl MapView {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            tiles: TileManager::new(),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Apply a one-shot camera move.
    pub fn apply(&mut self, request: ViewportRequest) {
        self.viewport = Viewport::new(request.center, request.zoom);
    }

    pub fn show(&mut self, ui: &mut egui::Ui, dashboard: &Dashboard) -> Vec<UiAction> {
        let mut actions = Vec::new();
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;

        // Camera input
        if response.dragged() {
            self.viewport.pan(response.drag_delta());
        }
        if let Some(hover) = response.hover_pos() {
            let (scroll, pinch) = ui.input(|i| (i.smooth_scroll_delta.y, i.zoom_delta()));
            let delta = f64::from(scroll) / 200.0 + f64::from(pinch.log2());
            if delta.abs() > 1e-3 {
                self.viewport.zoom_around(delta, hover, rect);
            }
        }

        painter.rect_filled(rect, 0.0, BACKGROUND);
        for (coord, tile_rect) in visible_tiles(&self.viewport, rect) {
            if let Some(texture) = self.tiles.get_tile(coord, ui.ctx()) {
                painter.image(
                    texture.id(),
                    tile_rect,
                    Rect::from_min_max(Pos2::ZERO, egui::pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
        }

        let overlay = dashboard.overlay();
        let scene = overlay.surface();
        for layer in paint_order(scene) {
            self.paint_layer(&painter, rect, layer);
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let at: LatLon = self.viewport.unproject(pos, rect);
                match hit_test(scene, &self.viewport, rect, pos) {
                    Some(Pick::Route(handle)) => actions.push(UiAction::ClickRoute { handle, at }),
                    Some(Pick::Node(id)) => actions.push(UiAction::OpenNodePopup(id)),
                    None if overlay.popup().is_some() => actions.push(UiAction::ClosePopup),
                    None => {}
                }
            }
        }

        if let Some(content) = overlay.popup() {
            let anchor = self.viewport.project(content.anchor(), rect);
            if rect.contains(anchor) {
                actions.extend(popup::show(ui.ctx(), content, anchor));
            }
        }

        let tooltip = response
            .hover_pos()
            .and_then(|pos| topmost(scene, &self.viewport, rect, pos))
            .and_then(|layer| layer.tooltip.clone());
        if let Some(text) = tooltip {
            response.on_hover_text_at_pointer(text);
        }

        if self.tiles.has_loading_tiles() {
            ui.ctx().request_repaint_after(std::time::Duration::from_millis(250));
        }
        actions
    }

    fn paint_layer(&self, painter: &egui::Painter, rect: Rect, layer: &Layer) {
        let color = overlay_color(layer.style.color);
        match &layer.shape {
            Shape::Polyline { points } => {
                let screen: Vec<Pos2> = points
                    .iter()
                    .map(|p| self.viewport.project(*p, rect))
                    .collect();
                painter.add(egui::Shape::line(screen, Stroke::new(layer.style.weight, color)));
            }
            Shape::Vertex { position, radius } => {
                let pos = self.viewport.project(*position, rect);
                painter.circle(
                    pos,
                    *radius,
                    color.gamma_multiply(0.5),
                    Stroke::new(layer.style.weight.min(2.0), color),
                );
            }
            Shape::Marker { position, label } => {
                let pos = self.viewport.project(*position, rect);
                painter.circle(pos, MARKER_RADIUS, color, Stroke::new(1.5, Color32::WHITE));
                if layer.label_visible {
                    painter.text(
                        pos,
                        Align2::CENTER_CENTER,
                        label,
                        FontId::proportional(8.0),
                        Color32::WHITE,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_overlay::{MapOverlayRenderer, Node, NodeRegistry, Route, RouteStore, Transport};

    fn rect() -> Rect {
        Rect::from_min_size(Pos2::ZERO, egui::vec2(800.0, 600.0))
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert!((distance_to_segment(Pos2::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-5);
        assert!((distance_to_segment(Pos2::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-5);
        assert!((distance_to_segment(Pos2::new(1.0, 1.0), a, a) - 2f32.sqrt()).abs() < 1e-5);
    }

    fn renderer_with_route() -> (MapOverlayRenderer, RouteHandle) {
        let mut nodes = NodeRegistry::new();
        let batch = vec![
            Node::new("A".to_string(), None, None, None).with_position(LatLon::new(0.0, -0.01)),
            Node::new("B".to_string(), None, None, None).with_position(LatLon::new(0.0, 0.01)),
        ];
        nodes.reconcile(batch);

        let mut renderer = MapOverlayRenderer::default();
        for node in nodes.iter() {
            renderer.upsert_node_marker(node, None);
        }
        let route = Route {
            source_id: "A".to_string(),
            dest_id: "B".to_string(),
            hop_count: 1,
            hops: Vec::new(),
            timestamp: chrono::DateTime::from_timestamp(0, 0).unwrap(),
            transport: Transport::Radio,
            radio_metrics: None,
        };
        let mut store = RouteStore::new();
        let plotted = store.reconcile(vec![route], None, &nodes).to_vec();
        renderer.rebuild_routes(&plotted, &nodes);
        let handle = renderer.route_handles()[0];
        (renderer, handle)
    }

    #[test]
    fn test_hit_test_line_and_marker() {
        let (renderer, handle) = renderer_with_route();
        let viewport = Viewport::new(LatLon::new(0.0, 0.0), 14.0);
        let scene = renderer.surface();

        // Midpoint of the line, away from both endpoints
        let mid = viewport.project(LatLon::new(0.0, 0.0), rect());
        assert_eq!(hit_test(scene, &viewport, rect(), mid), Some(Pick::Route(handle)));

        // Node markers win over route vertices at the same spot
        let a = viewport.project(LatLon::new(0.0, -0.01), rect());
        assert_eq!(
            hit_test(scene, &viewport, rect(), a),
            Some(Pick::Node("A".to_string()))
        );

        let empty = mid + egui::vec2(0.0, 100.0);
        assert_eq!(hit_test(scene, &viewport, rect(), empty), None);
    }

    #[test]
    fn test_hidden_routes_not_hit() {
        let (mut renderer, _) = renderer_with_route();
        renderer.set_global_visibility(false);
        let viewport = Viewport::new(LatLon::new(0.0, 0.0), 14.0);
        let mid = viewport.project(LatLon::new(0.0, 0.0), rect());
        assert_eq!(hit_test(renderer.surface(), &viewport, rect(), mid), None);
    }
}
