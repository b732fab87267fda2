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

//! Map overlay engine for mesh network dashboards.
//!
//! This library keeps the map of a mesh radio network in sync with a polling
//! backend: node markers that follow position fixes, traceroute polylines
//! colored by hop count, and a single-route highlight selection. It is split
//! into layers that can be used on their own:
//!
//! - **Model and API**: typed nodes and routes, wire records and an async
//!   HTTP client for the backend
//! - **State**: [`NodeRegistry`] and [`RouteStore`], replaced or merged on
//!   every poll
//! - **Overlay**: [`MapOverlayRenderer`] owning every visual object, drawn
//!   through a [`MapSurface`] (the retained [`Scene`] by default), with the
//!   [`HighlightController`] state machine deciding focus
//! - **Orchestration**: [`Dashboard`] and [`PollScheduler`], which order the
//!   fetches and discard results from superseded ticks
//!
//! # Quick Start
//!
//! [`Dashboard`] performs no I/O. The host executes its commands and feeds
//! the results back:
//!
//! ```
//! use std::time::Instant;
//! use mesh_overlay::{Command, Dashboard, DashboardConfig, Outcome};
//!
//! let mut dashboard = Dashboard::new(DashboardConfig::default());
//!
//! let Some(Command::FetchNodes { generation }) = dashboard.poll(Instant::now()) else {
//!     unreachable!("the first poll is always due");
//! };
//! let nodes = serde_json::from_str(
//!     r#"[{"node_id": "!a1", "lat": 45.0, "lon": 9.0},
//!         {"node_id": "!b2", "lat": 45.1, "lon": 9.1}]"#,
//! )
//! .unwrap();
//! let next = dashboard.handle(Outcome::Nodes { generation, result: Ok(nodes) });
//! assert!(matches!(next, Some(Command::FetchRoutes { .. })));
//!
//! let routes = serde_json::from_str(
//!     r#"[{"src_id": "!a1", "dest_id": "!b2", "route": [], "hop_count": 1, "ts": 1700000000}]"#,
//! )
//! .unwrap();
//! dashboard.handle(Outcome::Routes { generation, result: Ok(routes) });
//!
//! assert_eq!(dashboard.overlay().visible_routes().len(), 1);
//! ```
//!
//! # Using Individual Layers
//!
//! ```
//! use mesh_overlay::geo::{distance_km, LatLon};
//! use mesh_overlay::routes::hop_color;
//!
//! let km = distance_km(LatLon::new(0.0, 0.0), LatLon::new(0.0, 180.0));
//! assert!((km - 20015.0).abs() < 200.0);
//! assert_eq!(hop_color(9), hop_color(7));
//! ```

pub mod api;
pub mod dashboard;
pub mod geo;
pub mod highlight;
pub mod model;
pub mod overlay;
pub mod registry;
pub mod routes;
pub mod scheduler;

pub use api::{
    ApiClient, ApiError, NodeRecord, RecordError, TracerouteRecord, DEFAULT_REQUEST_TIMEOUT,
};
pub use dashboard::{
    ClearState, Command, Dashboard, DashboardConfig, Notification, Outcome, ViewportRequest,
};
pub use geo::LatLon;
pub use highlight::{HighlightController, HighlightState, RouteHandle, Transition};
pub use model::{Node, Route, RouteKey, Transport};
pub use overlay::{
    Layer, LayerId, MapOverlayRenderer, MapSurface, Owner, Popup, RouteInfo, Scene, Shape, Style,
};
pub use registry::{NodeEvent, NodeRegistry};
pub use routes::{
    group_by_source, LegendEntry, PlottedRoute, RouteStore, TracerouteGroup, TracerouteRow,
};
pub use scheduler::PollScheduler;
