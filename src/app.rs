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

//! eframe application: the GUI thread owns the dashboard and drives ticks.

use std::time::{Duration, Instant};

use log::info;
use mesh_overlay::{Command, Dashboard, Transition};

use crate::config::AppConfig;
use crate::map::Viewport;
use crate::network::NetworkWorker;
use crate::ui::{dialogs, panel, traceroutes, MapView, UiAction};

pub struct MeshMapApp {
    dashboard: Dashboard,
    worker: NetworkWorker,
    map: MapView,
    backend_url: String,
    panel_width: f32,
    traceroutes_open: bool,
}

impl std::fmt::Debug for MeshMapApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshMapApp")
            .field("backend_url", &self.backend_url)
            .finish_non_exhaustive()
    }
}

impl MeshMapApp {
    pub fn new(config: &AppConfig, worker: NetworkWorker) -> Self {
        Self {
            dashboard: Dashboard::new(config.dashboard_config()),
            worker,
            map: MapView::new(Viewport::default()),
            backend_url: config.backend_url.clone(),
            panel_width: config.panel_width,
            traceroutes_open: false,
        }
    }

    /// Feed finished network work into the dashboard and start due ticks.
    fn pump(&mut self) {
        for outcome in self.worker.drain() {
            if let Some(command) = self.dashboard.handle(outcome) {
                self.worker.send(command);
            }
        }
        if let Some(command) = self.dashboard.poll(Instant::now()) {
            self.worker.send(command);
        }
        if let Some(request) = self.dashboard.take_viewport_request() {
            self.map.apply(request);
        }
    }

    fn apply(&mut self, action: UiAction) {
        if let Some(command) = apply_action(&mut self.dashboard, action) {
            self.worker.send(command);
        }
    }
}

/// Route a UI action to the dashboard. Returns a command to dispatch, if any.
pub fn apply_action(dashboard: &mut Dashboard, action: UiAction) -> Option<Command> {
    match action {
        UiAction::SetRoutesVisible(visible) => dashboard.set_global_visibility(visible),
        UiAction::SetLabelsVisible(visible) => dashboard.set_labels_visible(visible),
        UiAction::ClickRoute { handle, at } => {
            if let Transition::Focus { target, .. } = dashboard.click_route(handle, at) {
                info!("Focused {}", target);
            }
        }
        UiAction::OpenNodePopup(node_id) => dashboard.open_node_popup(&node_id),
        UiAction::ClosePopup => dashboard.close_popup(),
        UiAction::ViewNodeRoutes { node_id, enabled } => {
            dashboard.view_node_routes(&node_id, enabled);
        }
        UiAction::RequestClearRoutes => dashboard.request_clear_routes(),
        UiAction::ConfirmClearRoutes => return dashboard.confirm_clear_routes(),
        UiAction::CancelClearRoutes => dashboard.cancel_clear_routes(),
        UiAction::DismissNotification => {
            dashboard.dismiss_notification();
        }
    }
    None
}

impl eframe::App for MeshMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump();

        let mut actions = Vec::new();

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(self.panel_width)
            .show(ctx, |ui| {
                actions.extend(panel::show(
                    ui,
                    &self.dashboard,
                    &self.backend_url,
                    &mut self.traceroutes_open,
                ));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                actions.extend(self.map.show(ui, &self.dashboard));
            });

        traceroutes::show(ctx, &self.dashboard, &mut self.traceroutes_open);
        actions.extend(dialogs::show(ctx, &self.dashboard));

        for action in actions {
            self.apply(action);
        }

        // Wake for the next tick even without input
        let wait = self
            .dashboard
            .scheduler()
            .time_until_due(Instant::now())
            .max(Duration::from_millis(100));
        ctx.request_repaint_after(wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_overlay::{ClearState, DashboardConfig};

    #[test]
    fn test_clear_actions_follow_confirmation() {
        let mut dashboard = Dashboard::new(DashboardConfig::default());

        assert_eq!(apply_action(&mut dashboard, UiAction::ConfirmClearRoutes), None);
        apply_action(&mut dashboard, UiAction::RequestClearRoutes);
        assert_eq!(dashboard.clear_state(), ClearState::AwaitingConfirmation);
        assert_eq!(
            apply_action(&mut dashboard, UiAction::ConfirmClearRoutes),
            Some(Command::ClearRoutes)
        );
    }

    #[test]
    fn test_toggle_actions() {
        let mut dashboard = Dashboard::new(DashboardConfig::default());
        apply_action(&mut dashboard, UiAction::SetRoutesVisible(false));
        apply_action(&mut dashboard, UiAction::SetLabelsVisible(false));
        assert!(!dashboard.overlay().routes_visible());
        assert!(!dashboard.overlay().labels_visible());

        apply_action(
            &mut dashboard,
            UiAction::ViewNodeRoutes {
                node_id: "B".to_string(),
                enabled: true,
            },
        );
        assert!(dashboard.overlay().routes_visible());
        assert_eq!(dashboard.overlay().node_route_filter(), Some("B"));
    }

    #[test]
    fn test_popup_actions_for_unknown_node() {
        let mut dashboard = Dashboard::new(DashboardConfig::default());
        apply_action(&mut dashboard, UiAction::OpenNodePopup("missing".to_string()));
        assert!(dashboard.overlay().popup().is_none());
        apply_action(&mut dashboard, UiAction::ClosePopup);
        assert!(dashboard.overlay().popup().is_none());
    }
}
