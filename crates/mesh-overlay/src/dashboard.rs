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

//! Single-writer composition of the overlay engine.
//!
//! [`Dashboard`] owns the node registry, the route store, the overlay
//! renderer and the poll scheduler. It performs no I/O: the host asks it for
//! [`Command`]s, executes them however it likes and feeds the resulting
//! [`Outcome`]s back through [`Dashboard::handle`]. Each tick runs nodes
//! first, then routes, and results from superseded generations are dropped.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::api::{decode_nodes, decode_routes, ApiError, NodeRecord, TracerouteRecord};
use crate::geo::LatLon;
use crate::highlight::{RouteHandle, Transition};
use crate::model::{Node, Route};
use crate::overlay::MapOverlayRenderer;
use crate::registry::{NodeEvent, NodeRegistry};
use crate::routes::RouteStore;
use crate::scheduler::{PollScheduler, DEFAULT_POLL_INTERVAL};

/// Zoom level used when centering on a node.
pub const DEFAULT_CENTER_ZOOM: f64 = 13.0;
/// Traceroute batch size requested per tick.
pub const DEFAULT_ROUTE_LIMIT: u32 = 1000;
/// Consecutive stale discards before the dashboard warns that ticks are
/// being superseded faster than the backend answers.
const STALE_WARN_THRESHOLD: u32 = 3;

/// Work the host must perform on the dashboard's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `GET /api/nodes`
    FetchNodes { generation: u64 },
    /// `GET /api/traceroutes?limit=N`
    FetchRoutes { generation: u64, limit: u32 },
    /// `DELETE /api/traceroutes`
    ClearRoutes,
}

/// Result of a [`Command`], handed back to [`Dashboard::handle`].
#[derive(Debug)]
pub enum Outcome {
    Nodes {
        generation: u64,
        result: Result<Vec<NodeRecord>, ApiError>,
    },
    Routes {
        generation: u64,
        result: Result<Vec<TracerouteRecord>, ApiError>,
    },
    Cleared(Result<(), ApiError>),
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub poll_interval: Duration,
    pub route_limit: u32,
    /// Node to center on at startup, if it has a position.
    pub center_node_id: Option<String>,
    pub center_zoom: f64,
    pub show_routes: bool,
    pub show_labels: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            route_limit: DEFAULT_ROUTE_LIMIT,
            center_node_id: None,
            center_zoom: DEFAULT_CENTER_ZOOM,
            show_routes: true,
            show_labels: true,
        }
    }
}

/// One-shot camera move for the front-end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRequest {
    pub center: LatLon,
    pub zoom: f64,
}

/// Initial centering preference, consumed by the first successful node fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InitialCenter {
    Node(String),
    FirstPositioned,
}

/// Progress of the "clear all routes" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearState {
    #[default]
    Idle,
    AwaitingConfirmation,
    InFlight,
}

/// Message the user must acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    scheduler: PollScheduler,
    nodes: NodeRegistry,
    routes: RouteStore,
    overlay: MapOverlayRenderer,
    pending_center: Option<InitialCenter>,
    viewport_request: Option<ViewportRequest>,
    clear_state: ClearState,
    notifications: VecDeque<Notification>,
    last_error: Option<String>,
    stale_streak: u32,
}

impl Dashboard {
    #[must_use]
    pub fn new(config: DashboardConfig) -> Self {
        let mut overlay = MapOverlayRenderer::default();
        overlay.set_global_visibility(config.show_routes);
        overlay.set_labels_visible(config.show_labels);

        let pending_center = Some(
            config
                .center_node_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .map_or(InitialCenter::FirstPositioned, InitialCenter::Node),
        );

        Self {
            scheduler: PollScheduler::new(config.poll_interval),
            nodes: NodeRegistry::new(),
            routes: RouteStore::new(),
            overlay,
            pending_center,
            viewport_request: None,
            clear_state: ClearState::Idle,
            notifications: VecDeque::new(),
            last_error: None,
            stale_streak: 0,
            config,
        }
    }

    // --- tick pipeline -------------------------------------------------

    /// Start a tick if one is due.
    pub fn poll(&mut self, now: Instant) -> Option<Command> {
        if !self.scheduler.due(now) {
            return None;
        }
        let generation = self.scheduler.begin_tick(now);
        Some(Command::FetchNodes { generation })
    }

    /// Apply a finished command. May return a follow-up command.
    pub fn handle(&mut self, outcome: Outcome) -> Option<Command> {
        match outcome {
            Outcome::Nodes { generation, result } => {
                if !self.accept(generation) {
                    return None;
                }
                match result {
                    Ok(records) => {
                        self.last_error = None;
                        self.apply_nodes(decode_nodes(records));
                    }
                    Err(e) => {
                        warn!("Node fetch failed: {}", e);
                        self.last_error = Some(e.to_string());
                    }
                }
                Some(self.fetch_routes(generation))
            }
            Outcome::Routes { generation, result } => {
                if !self.accept(generation) {
                    return None;
                }
                self.stale_streak = 0;
                match result {
                    Ok(records) => {
                        self.last_error = None;
                        self.apply_routes(decode_routes(records));
                    }
                    Err(e) => {
                        warn!("Traceroute fetch failed: {}", e);
                        self.last_error = Some(e.to_string());
                        self.routes.clear();
                        self.overlay.rebuild_routes(&[], &self.nodes);
                    }
                }
                None
            }
            Outcome::Cleared(result) => {
                self.clear_state = ClearState::Idle;
                match result {
                    Ok(()) => {
                        info!("All traceroutes cleared");
                        self.routes.clear();
                        self.overlay.rebuild_routes(&[], &self.nodes);
                    }
                    Err(e) => {
                        warn!("Clearing traceroutes failed: {}", e);
                        self.notifications.push_back(Notification {
                            title: "Clear failed".to_string(),
                            message: format!("Could not clear traceroutes: {e}"),
                        });
                    }
                }
                let generation = self.scheduler.begin_route_refresh();
                Some(self.fetch_routes(generation))
            }
        }
    }

    fn accept(&mut self, generation: u64) -> bool {
        if self.scheduler.is_current(generation) {
            return true;
        }
        self.stale_streak += 1;
        debug!(
            "Discarding stale result: generation {} (current {})",
            generation,
            self.scheduler.generation()
        );
        if self.stale_streak % STALE_WARN_THRESHOLD == 0 {
            warn!(
                "{} results in a row arrived after their tick was superseded; \
                 the backend may be slower than the {}s poll interval",
                self.stale_streak,
                self.scheduler.interval().as_secs()
            );
        }
        false
    }

    fn fetch_routes(&self, generation: u64) -> Command {
        Command::FetchRoutes {
            generation,
            limit: self.config.route_limit,
        }
    }

    fn apply_nodes(&mut self, fetched: Vec<Node>) {
        let ids: Vec<String> = fetched.iter().map(|n| n.id.clone()).collect();
        let events = self.nodes.reconcile(fetched);

        if let Some(preference) = self.pending_center.take() {
            self.viewport_request = self.initial_center(&preference);
            if let Some(request) = self.viewport_request {
                info!(
                    "Centering on ({:.5}, {:.5}) at zoom {}",
                    request.center.lat, request.center.lon, request.zoom
                );
            }
        }

        let by_id: HashMap<&str, &NodeEvent> = events.iter().map(|e| (e.node_id(), e)).collect();
        for id in &ids {
            if let Some(node) = self.nodes.get(id) {
                self.overlay
                    .upsert_node_marker(node, by_id.get(id.as_str()).copied());
            }
        }
    }

    fn initial_center(&self, preference: &InitialCenter) -> Option<ViewportRequest> {
        let configured = match preference {
            InitialCenter::Node(id) => {
                let position = self.nodes.position_of(id);
                if position.is_none() {
                    warn!("Center node {} has no known position, using first node", id);
                }
                position
            }
            InitialCenter::FirstPositioned => None,
        };

        configured
            .or_else(|| self.nodes.iter().find_map(|n| n.position))
            .map(|center| ViewportRequest {
                center,
                zoom: self.config.center_zoom,
            })
    }

    fn apply_routes(&mut self, fetched: Vec<Route>) {
        let filter = self.overlay.node_route_filter().map(str::to_string);
        let plotted = self.routes.reconcile(fetched, filter.as_deref(), &self.nodes);
        self.overlay.rebuild_routes(plotted, &self.nodes);
    }

    // --- user actions --------------------------------------------------

    pub fn click_route(&mut self, handle: RouteHandle, at: LatLon) -> Transition {
        self.overlay.click_route(handle, at)
    }

    pub fn set_global_visibility(&mut self, visible: bool) {
        self.overlay.set_global_visibility(visible);
    }

    pub fn set_labels_visible(&mut self, visible: bool) {
        self.overlay.set_labels_visible(visible);
    }

    /// Restrict the overlay to routes through `node_id`, or lift the
    /// restriction.
    ///
    /// Enabling forces global route visibility on. The overlay is rebuilt
    /// from the last fetched batch right away and later ticks keep the
    /// filter.
    pub fn view_node_routes(&mut self, node_id: &str, enabled: bool) {
        let filter = if enabled {
            Some(node_id.to_string())
        } else if self.overlay.node_route_filter() == Some(node_id) {
            None
        } else {
            return;
        };

        if enabled && !self.overlay.routes_visible() {
            self.overlay.set_global_visibility(true);
        }
        info!("Route filter: {:?}", filter);
        self.overlay.set_node_route_filter(filter.clone());

        let plotted = self.routes.refilter(filter.as_deref(), &self.nodes);
        self.overlay.rebuild_routes(plotted, &self.nodes);
    }

    pub fn open_node_popup(&mut self, node_id: &str) {
        if let Some(node) = self.nodes.get(node_id) {
            self.overlay.open_node_popup(node);
        }
    }

    pub fn close_popup(&mut self) {
        self.overlay.close_popup();
    }

    /// First step of "clear all routes": ask for confirmation.
    pub fn request_clear_routes(&mut self) {
        if self.clear_state == ClearState::Idle {
            self.clear_state = ClearState::AwaitingConfirmation;
        }
    }

    pub fn cancel_clear_routes(&mut self) {
        if self.clear_state == ClearState::AwaitingConfirmation {
            self.clear_state = ClearState::Idle;
        }
    }

    /// Confirmed: issue the delete. Returns `None` unless confirmation was
    /// pending.
    pub fn confirm_clear_routes(&mut self) -> Option<Command> {
        if self.clear_state != ClearState::AwaitingConfirmation {
            return None;
        }
        info!("Clearing all traceroutes");
        self.clear_state = ClearState::InFlight;
        Some(Command::ClearRoutes)
    }

    /// Move the camera once, if a centering decision is pending.
    pub fn take_viewport_request(&mut self) -> Option<ViewportRequest> {
        self.viewport_request.take()
    }

    #[must_use]
    pub fn notification(&self) -> Option<&Notification> {
        self.notifications.front()
    }

    pub fn dismiss_notification(&mut self) -> Option<Notification> {
        self.notifications.pop_front()
    }

    // --- accessors -----------------------------------------------------

    #[must_use]
    pub fn overlay(&self) -> &MapOverlayRenderer {
        &self.overlay
    }

    #[must_use]
    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    #[must_use]
    pub fn routes(&self) -> &RouteStore {
        &self.routes
    }

    #[must_use]
    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn clear_state(&self) -> ClearState {
        self.clear_state
    }

    /// Results discarded as stale since the last completed tick.
    #[must_use]
    pub fn stale_discards(&self) -> u32 {
        self.stale_streak
    }

    /// Most recent fetch error, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }
}
