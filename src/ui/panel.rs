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

//! Side panel: overlay toggles, the clear-all button, hop legend and status.

use egui::{Color32, RichText};
use mesh_overlay::{ClearState, Dashboard};

use super::{overlay_color, UiAction};

pub fn show(
    ui: &mut egui::Ui,
    dashboard: &Dashboard,
    backend_url: &str,
    list_open: &mut bool,
) -> Vec<UiAction> {
    let mut actions = Vec::new();
    let overlay = dashboard.overlay();

    ui.heading("Mesh Map");
    ui.add_space(4.0);

    let mut routes_visible = overlay.routes_visible();
    if ui.checkbox(&mut routes_visible, "Show routes").changed() {
        actions.push(UiAction::SetRoutesVisible(routes_visible));
    }
    let mut labels_visible = overlay.labels_visible();
    if ui.checkbox(&mut labels_visible, "Show node labels").changed() {
        actions.push(UiAction::SetLabelsVisible(labels_visible));
    }

    if let Some(node_id) = overlay.node_route_filter() {
        ui.horizontal(|ui| {
            let name = dashboard.nodes().display_name(node_id);
            ui.label(RichText::new(format!("Only routes via {name}")).italics());
            if ui.small_button("✕").clicked() {
                actions.push(UiAction::ViewNodeRoutes {
                    node_id: node_id.to_string(),
                    enabled: false,
                });
            }
        });
    }

    ui.add_space(4.0);
    let idle = dashboard.clear_state() == ClearState::Idle;
    if ui
        .add_enabled(idle, egui::Button::new("🗑 Clear all routes"))
        .clicked()
    {
        actions.push(UiAction::RequestClearRoutes);
    }
    ui.toggle_value(list_open, "📋 Traceroute list");

    ui.separator();
    ui.label(RichText::new("Hops").strong());
    for entry in overlay.legend() {
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(24.0, 4.0), egui::Sense::hover());
            ui.painter().rect_filled(rect, 1.0, overlay_color(entry.color));
            ui.label(RichText::new(entry.label).size(11.0));
        });
    }

    ui.separator();
    ui.label(RichText::new("Status").strong());
    let grey = Color32::from_rgb(150, 150, 150);
    ui.label(RichText::new(backend_url).monospace().size(10.0).color(grey));
    ui.label(format!("Nodes: {}", dashboard.nodes().len()));
    ui.label(format!(
        "Routes: {} shown / {} fetched",
        overlay.visible_routes().len(),
        dashboard.routes().fetched().len()
    ));
    ui.label(
        RichText::new(format!("Tick #{}", dashboard.scheduler().generation()))
            .size(10.0)
            .color(grey),
    );
    if let Some(error) = dashboard.last_error() {
        ui.label(
            RichText::new(format!("⚠ {error}"))
                .size(11.0)
                .color(Color32::from_rgb(255, 120, 80)),
        );
    }

    actions
}
