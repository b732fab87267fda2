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

//! Retained visual object graph.
//!
//! [`MapSurface`] is the seam between the overlay renderer and whatever draws
//! the map. [`Scene`] is the in-memory implementation: it stores every layer
//! with its attachment flag and z-order, and a front-end paints the attached
//! ones each frame.

use std::collections::HashMap;

use crate::geo::LatLon;
use crate::highlight::RouteHandle;

/// Identifier of one visual object on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u64);

/// Geometry of a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Node marker with an optional text label inside.
    Marker { position: LatLon, label: String },
    /// Small circle at a route path coordinate.
    Vertex { position: LatLon, radius: f32 },
    Polyline { points: Vec<LatLon> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    /// `#rrggbb`
    pub color: &'static str,
    pub weight: f32,
}

/// What a layer belongs to, used to map clicks back to the domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Node(String),
    RouteLine(RouteHandle),
    RouteVertex(RouteHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub shape: Shape,
    pub style: Style,
    pub owner: Owner,
    pub tooltip: Option<String>,
    pub attached: bool,
    pub label_visible: bool,
    pub z: u64,
}

impl Layer {
    #[must_use]
    pub fn new(shape: Shape, style: Style, owner: Owner) -> Self {
        Self {
            shape,
            style,
            owner,
            tooltip: None,
            attached: false,
            label_visible: true,
            z: 0,
        }
    }

    #[must_use]
    pub fn with_tooltip(mut self, tooltip: String) -> Self {
        self.tooltip = Some(tooltip);
        self
    }

    #[must_use]
    pub fn attached(mut self, attached: bool) -> Self {
        self.attached = attached;
        self
    }
}

/// Operations the overlay renderer performs on the map.
pub trait MapSurface {
    /// Add a new layer. The layer's `attached` flag decides initial visibility.
    fn insert(&mut self, id: LayerId, layer: Layer);
    /// Destroy a layer.
    fn remove(&mut self, id: LayerId) -> Option<Layer>;
    /// Attach to or detach from the map without destroying.
    fn set_attached(&mut self, id: LayerId, attached: bool);
    /// Move a marker or vertex in place.
    fn set_position(&mut self, id: LayerId, position: LatLon);
    fn set_label(&mut self, id: LayerId, label: &str);
    fn set_label_visible(&mut self, id: LayerId, visible: bool);
    fn set_style(&mut self, id: LayerId, style: Style);
    fn bring_to_front(&mut self, id: LayerId);
    fn layer(&self, id: LayerId) -> Option<&Layer>;
}

/// In-memory map surface.
#[derive(Debug, Default)]
pub struct Scene {
    layers: HashMap<LayerId, Layer>,
    next_z: u64,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_z(&mut self) -> u64 {
        self.next_z += 1;
        self.next_z
    }

    /// Attached layers, back to front.
    #[must_use]
    pub fn attached_layers(&self) -> Vec<(LayerId, &Layer)> {
        let mut layers: Vec<(LayerId, &Layer)> = self
            .layers
            .iter()
            .filter(|(_, layer)| layer.attached)
            .map(|(id, layer)| (*id, layer))
            .collect();
        layers.sort_by_key(|(id, layer)| (layer.z, *id));
        layers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl MapSurface for Scene {
    fn insert(&mut self, id: LayerId, mut layer: Layer) {
        layer.z = self.bump_z();
        self.layers.insert(id, layer);
    }

    fn remove(&mut self, id: LayerId) -> Option<Layer> {
        self.layers.remove(&id)
    }

    fn set_attached(&mut self, id: LayerId, attached: bool) {
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.attached = attached;
        }
    }

    fn set_position(&mut self, id: LayerId, position: LatLon) {
        if let Some(layer) = self.layers.get_mut(&id) {
            match &mut layer.shape {
                Shape::Marker { position: p, .. } | Shape::Vertex { position: p, .. } => {
                    *p = position;
                }
                Shape::Polyline { .. } => {}
            }
        }
    }

    fn set_label(&mut self, id: LayerId, label: &str) {
        if let Some(Layer {
            shape: Shape::Marker { label: l, .. },
            ..
        }) = self.layers.get_mut(&id)
        {
            label.clone_into(l);
        }
    }

    fn set_label_visible(&mut self, id: LayerId, visible: bool) {
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.label_visible = visible;
        }
    }

    fn set_style(&mut self, id: LayerId, style: Style) {
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.style = style;
        }
    }

    fn bring_to_front(&mut self, id: LayerId) {
        let z = self.bump_z();
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.z = z;
        }
    }

    fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLE: Style = Style {
        color: "#ffffff",
        weight: 1.0,
    };

    fn marker(lat: f64) -> Layer {
        Layer::new(
            Shape::Marker {
                position: LatLon::new(lat, 0.0),
                label: "A".to_string(),
            },
            STYLE,
            Owner::Node("A".to_string()),
        )
    }

    #[test]
    fn test_detached_layers_not_listed() {
        let mut scene = Scene::new();
        scene.insert(LayerId(1), marker(0.0).attached(true));
        scene.insert(LayerId(2), marker(1.0));

        let attached = scene.attached_layers();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].0, LayerId(1));
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_bring_to_front_reorders() {
        let mut scene = Scene::new();
        scene.insert(LayerId(1), marker(0.0).attached(true));
        scene.insert(LayerId(2), marker(1.0).attached(true));
        scene.bring_to_front(LayerId(1));

        let order: Vec<LayerId> = scene.attached_layers().iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![LayerId(2), LayerId(1)]);
    }

    #[test]
    fn test_set_position_and_label() {
        let mut scene = Scene::new();
        scene.insert(LayerId(1), marker(0.0));
        scene.set_position(LayerId(1), LatLon::new(5.0, 6.0));
        scene.set_label(LayerId(1), "B");

        assert_eq!(
            scene.layer(LayerId(1)).map(|l| &l.shape),
            Some(&Shape::Marker {
                position: LatLon::new(5.0, 6.0),
                label: "B".to_string()
            })
        );
    }
}
