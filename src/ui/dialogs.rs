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

//! Blocking dialogs: clear-all confirmation and error notifications.

use egui::{Color32, RichText};
use mesh_overlay::{ClearState, Dashboard};

use super::UiAction;

pub fn show(ctx: &egui::Context, dashboard: &Dashboard) -> Vec<UiAction> {
    let mut actions = Vec::new();

    if dashboard.clear_state() == ClearState::AwaitingConfirmation {
        let modal = egui::Modal::new(egui::Id::new("confirm_clear")).show(ctx, |ui| {
            ui.set_width(300.0);
            ui.heading("Clear all routes?");
            ui.label("Every stored traceroute will be deleted on the server.");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui
                    .button(RichText::new("Delete").color(Color32::from_rgb(255, 90, 90)))
                    .clicked()
                {
                    actions.push(UiAction::ConfirmClearRoutes);
                }
                if ui.button("Cancel").clicked() {
                    actions.push(UiAction::CancelClearRoutes);
                }
            });
        });
        if modal.should_close() && actions.is_empty() {
            actions.push(UiAction::CancelClearRoutes);
        }
    } else if let Some(notification) = dashboard.notification() {
        let modal = egui::Modal::new(egui::Id::new("notification")).show(ctx, |ui| {
            ui.set_width(300.0);
            ui.heading(&notification.title);
            ui.label(&notification.message);
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                actions.push(UiAction::DismissNotification);
            }
        });
        if modal.should_close() && actions.is_empty() {
            actions.push(UiAction::DismissNotification);
        }
    }

    actions
}
