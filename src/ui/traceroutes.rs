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

//! Traceroute list window, grouped by source node.

use egui::{Color32, RichText};
use mesh_overlay::routes::hop_color;
use mesh_overlay::{group_by_source, Dashboard};

use super::overlay_color;

pub fn show(ctx: &egui::Context, dashboard: &Dashboard, open: &mut bool) {
    egui::Window::new("Traceroutes")
        .open(open)
        .default_size([520.0, 420.0])
        .resizable(true)
        .show(ctx, |ui| {
            let groups = group_by_source(dashboard.routes().fetched(), dashboard.nodes());
            if groups.is_empty() {
                ui.label(RichText::new("No traceroutes yet").italics());
                return;
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                for group in &groups {
                    let title = format!("{}  ·  {}", group.heading, group.rows.len());
                    egui::CollapsingHeader::new(RichText::new(title).strong())
                    .id_salt(&group.source_id)
                    .default_open(true)
                    .show(ui, |ui| {
                        egui::Grid::new(("traceroutes", &group.source_id))
                            .num_columns(3)
                            .striped(true)
                            .show(ui, |ui| {
                                ui.label(RichText::new("Destination").strong());
                                ui.label(RichText::new("Hops").strong());
                                ui.label(RichText::new("Path").strong());
                                ui.end_row();

                                for row in &group.rows {
                                    ui.label(row.destination.as_str());
                                    ui.label(
                                        RichText::new(row.hop_count.to_string())
                                            .color(overlay_color(hop_color(row.hop_count))),
                                    );
                                    if row.path.is_empty() {
                                        ui.label(
                                            RichText::new("direct")
                                                .color(Color32::from_rgb(150, 150, 150)),
                                        );
                                    } else {
                                        ui.label(row.path.as_str());
                                    }
                                    ui.end_row();
                                }
                            });
                    });
                }
            });
        });
}
