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

//! Web Mercator projection and the pan/zoom viewport.

use egui::{Pos2, Rect, Vec2};
use mesh_overlay::LatLon;

/// Edge length of one map tile in screen pixels.
pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 19.0;
/// Latitude limit of the square Mercator world.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Web Mercator projection utilities
#[derive(Debug)]
pub struct WebMercator;

impl WebMercator {
    /// Convert latitude to Web Mercator Y in tile units at `zoom`
    pub fn lat_to_y(lat: f64, zoom: f64) -> f64 {
        let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let n = zoom.exp2();
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0;
        y * n
    }

    /// Convert longitude to Web Mercator X in tile units at `zoom`
    pub fn lon_to_x(lon: f64, zoom: f64) -> f64 {
        let n = zoom.exp2();
        ((lon + 180.0) / 360.0) * n
    }

    /// Convert tile Y back to latitude
    pub fn y_to_lat(y: f64, zoom: f64) -> f64 {
        let n = zoom.exp2();
        let lat_rad = (std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh().atan();
        lat_rad.to_degrees()
    }

    /// Convert tile X back to longitude
    pub fn x_to_lon(x: f64, zoom: f64) -> f64 {
        let n = zoom.exp2();
        x / n * 360.0 - 180.0
    }
}

/// Camera over the map: center coordinate and fractional zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLon,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: LatLon::new(0.0, 0.0),
            zoom: MIN_ZOOM,
        }
    }
}

impl Viewport {
    pub fn new(center: LatLon, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Pixel position of `point` in world coordinates at the current zoom.
    fn world_px(&self, point: LatLon) -> (f64, f64) {
        (
            WebMercator::lon_to_x(point.lon, self.zoom) * TILE_SIZE,
            WebMercator::lat_to_y(point.lat, self.zoom) * TILE_SIZE,
        )
    }

    fn from_world_px(&self, x: f64, y: f64) -> LatLon {
        LatLon::new(
            WebMercator::y_to_lat(y / TILE_SIZE, self.zoom),
            WebMercator::x_to_lon(x / TILE_SIZE, self.zoom),
        )
    }

    /// Screen position of `point` inside `rect`, with the center at the
    /// middle of the rect.
    #[allow(clippy::cast_possible_truncation, reason = "screen coordinates fit in f32")]
    pub fn project(&self, point: LatLon, rect: Rect) -> Pos2 {
        let (cx, cy) = self.world_px(self.center);
        let (px, py) = self.world_px(point);
        rect.center() + Vec2::new((px - cx) as f32, (py - cy) as f32)
    }

    /// Geographic coordinate under a screen position.
    pub fn unproject(&self, pos: Pos2, rect: Rect) -> LatLon {
        let (cx, cy) = self.world_px(self.center);
        let offset = pos - rect.center();
        self.from_world_px(cx + f64::from(offset.x), cy + f64::from(offset.y))
    }

    /// Move the map by a screen-space drag delta.
    pub fn pan(&mut self, delta: Vec2) {
        let (cx, cy) = self.world_px(self.center);
        let world = self.zoom.exp2() * TILE_SIZE;
        let x = (cx - f64::from(delta.x)).rem_euclid(world);
        let y = (cy - f64::from(delta.y)).clamp(0.0, world);
        self.center = self.from_world_px(x, y);
    }

    /// Change zoom by `delta` levels keeping the point under `anchor` fixed.
    pub fn zoom_around(&mut self, delta: f64, anchor: Pos2, rect: Rect) {
        let target = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        if (target - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let fixed = self.unproject(anchor, rect);
        self.zoom = target;
        let drift = self.project(fixed, rect) - anchor;
        self.pan(-drift);
    }

    /// Integer zoom level for tile fetching.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "zoom is clamped to 2..=19"
    )]
    pub fn tile_zoom(&self) -> u8 {
        self.zoom.floor() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))
    }

    #[test]
    fn test_mercator_round_trip() {
        let x = WebMercator::lon_to_x(9.19, 13.0);
        let y = WebMercator::lat_to_y(45.46, 13.0);
        assert!((WebMercator::x_to_lon(x, 13.0) - 9.19).abs() < 1e-9);
        assert!((WebMercator::y_to_lat(y, 13.0) - 45.46).abs() < 1e-9);
    }

    #[test]
    fn test_origin_is_world_center() {
        assert!((WebMercator::lon_to_x(0.0, 0.0) - 0.5).abs() < 1e-12);
        assert!((WebMercator::lat_to_y(0.0, 0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_center_projects_to_rect_center() {
        let viewport = Viewport::new(LatLon::new(45.0, 9.0), 10.0);
        let pos = viewport.project(LatLon::new(45.0, 9.0), rect());
        assert!((pos - rect().center()).length() < 1e-3);
    }

    #[test]
    fn test_east_is_right_north_is_up() {
        let viewport = Viewport::new(LatLon::new(0.0, 0.0), 8.0);
        let east = viewport.project(LatLon::new(0.0, 1.0), rect());
        let north = viewport.project(LatLon::new(1.0, 0.0), rect());
        assert!(east.x > rect().center().x);
        assert!(north.y < rect().center().y);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let viewport = Viewport::new(LatLon::new(45.0, 9.0), 12.5);
        let point = LatLon::new(45.01, 9.02);
        let back = viewport.unproject(viewport.project(point, rect()), rect());
        assert!((back.lat - point.lat).abs() < 1e-4);
        assert!((back.lon - point.lon).abs() < 1e-4);
    }

    #[test]
    fn test_pan_moves_center_opposite_to_drag() {
        let mut viewport = Viewport::new(LatLon::new(0.0, 0.0), 8.0);
        viewport.pan(Vec2::new(100.0, 0.0));
        assert!(viewport.center.lon < 0.0);
        assert!(viewport.center.lat.abs() < 1e-9);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut viewport = Viewport::new(LatLon::new(45.0, 9.0), 10.0);
        let anchor = Pos2::new(600.0, 150.0);
        let before = viewport.unproject(anchor, rect());

        viewport.zoom_around(1.0, anchor, rect());

        let after = viewport.unproject(anchor, rect());
        assert!((viewport.zoom - 11.0).abs() < f64::EPSILON);
        assert!((after.lat - before.lat).abs() < 1e-3);
        assert!((after.lon - before.lon).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport::new(LatLon::new(0.0, 0.0), 30.0);
        assert!((viewport.zoom - MAX_ZOOM).abs() < f64::EPSILON);
        viewport.zoom_around(-40.0, rect().center(), rect());
        assert!((viewport.zoom - MIN_ZOOM).abs() < f64::EPSILON);
        assert_eq!(viewport.tile_zoom(), 2);
    }
}
