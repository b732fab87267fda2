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

//! UI components for MeshMap Desktop.
//!
//! Components never touch the dashboard directly: they read it and return
//! [`UiAction`]s that the app applies after the frame is laid out.

pub mod dialogs;
pub mod map_view;
pub mod panel;
pub mod popup;
pub mod traceroutes;

pub use map_view::MapView;

use egui::Color32;
use mesh_overlay::{LatLon, RouteHandle};

/// User intent collected while drawing a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    SetRoutesVisible(bool),
    SetLabelsVisible(bool),
    ClickRoute { handle: RouteHandle, at: LatLon },
    OpenNodePopup(String),
    ClosePopup,
    ViewNodeRoutes { node_id: String, enabled: bool },
    RequestClearRoutes,
    ConfirmClearRoutes,
    CancelClearRoutes,
    DismissNotification,
}

/// Parse a `#rrggbb` overlay color.
pub fn overlay_color(hex: &str) -> Color32 {
    Color32::from_hex(hex).unwrap_or(Color32::GRAY)
}
