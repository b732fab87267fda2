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

//! Popup bubbles anchored to a map position.

use egui::{Color32, Pos2, RichText};
use mesh_overlay::Popup;

use super::UiAction;

const POPUP_OFFSET: egui::Vec2 = egui::vec2(12.0, -12.0);

/// Draw the open popup with its top-left corner next to `anchor`.
pub fn show(ctx: &egui::Context, popup: &Popup, anchor: Pos2) -> Vec<UiAction> {
    let mut actions = Vec::new();

    egui::Area::new(egui::Id::new("map_popup"))
        .order(egui::Order::Foreground)
        .fixed_pos(anchor + POPUP_OFFSET)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style())
                .fill(Color32::from_rgba_unmultiplied(25, 30, 35, 235))
                .show(ui, |ui| {
                    ui.set_max_width(280.0);
                    let lines = popup.lines();
                    ui.horizontal(|ui| {
                        if let Some(title) = lines.first() {
                            ui.label(RichText::new(title).strong().color(Color32::WHITE));
                        }
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("✕").clicked() {
                                actions.push(UiAction::ClosePopup);
                            }
                        });
                    });
                    ui.separator();
                    for line in lines.iter().skip(1) {
                        ui.label(RichText::new(line).size(11.0));
                    }

                    if let Popup::Node { content, .. } = popup {
                        let mut checked = content.routes_filter_checked;
                        if ui.checkbox(&mut checked, "Show routes for this node").changed() {
                            actions.push(UiAction::ViewNodeRoutes {
                                node_id: content.node_id.clone(),
                                enabled: checked,
                            });
                        }
                    }
                });
        });

    actions
}
