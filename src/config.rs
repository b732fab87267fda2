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

//! Application configuration management.
//!
//! Persistent settings are stored as TOML through `confy`. Command line flags
//! override them for a single run and can be written back with
//! `--save-config`.

use std::time::Duration;

use mesh_overlay::{DashboardConfig, DEFAULT_REQUEST_TIMEOUT};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "meshmap-desktop";
const CONFIG_NAME: &str = "config";

/// Default backend address
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the mesh backend API
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Seconds between refresh ticks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum traceroutes requested per tick
    #[serde(default = "default_route_limit")]
    pub route_limit: u32,

    /// Node to center on at startup
    #[serde(default)]
    pub center_node_id: Option<String>,

    /// Show traceroute overlays on startup
    #[serde(default = "default_true")]
    pub show_routes: bool,

    /// Show short labels inside node markers on startup
    #[serde(default = "default_true")]
    pub show_labels: bool,

    /// Zoom used when centering on a node
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,

    /// Side panel width in pixels
    #[serde(default = "default_panel_width")]
    pub panel_width: f32,
}

// Default value functions for serde
fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_route_limit() -> u32 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_zoom() -> f64 {
    13.0
}

fn default_panel_width() -> f32 {
    260.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            poll_interval_secs: default_poll_interval_secs(),
            route_limit: default_route_limit(),
            center_node_id: None,
            show_routes: true,
            show_labels: true,
            default_zoom: default_zoom(),
            panel_width: default_panel_width(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Engine settings derived from this configuration.
    ///
    /// A zero interval or limit is treated as the default.
    #[must_use]
    pub fn dashboard_config(&self) -> DashboardConfig {
        let interval = if self.poll_interval_secs == 0 {
            default_poll_interval_secs()
        } else {
            self.poll_interval_secs
        };
        let limit = if self.route_limit == 0 {
            default_route_limit()
        } else {
            self.route_limit
        };

        DashboardConfig {
            poll_interval: Duration::from_secs(interval),
            route_limit: limit,
            center_node_id: self
                .center_node_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            center_zoom: self.default_zoom.clamp(1.0, 19.0),
            show_routes: self.show_routes,
            show_labels: self.show_labels,
        }
    }

    /// HTTP timeout for backend calls. A tick makes two sequential calls, so
    /// each must finish well inside the poll interval.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        let interval = self.dashboard_config().poll_interval;
        DEFAULT_REQUEST_TIMEOUT.min(interval / 3).max(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"backend_url": "http://mesh:9000"}"#).unwrap();
        assert_eq!(config.backend_url, "http://mesh:9000");
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.route_limit, 1000);
        assert!(config.show_routes);
        assert!(config.center_node_id.is_none());
    }

    #[test]
    fn test_dashboard_config_mapping() {
        let config = AppConfig {
            poll_interval_secs: 30,
            route_limit: 50,
            center_node_id: Some("!abcd".to_string()),
            show_labels: false,
            ..AppConfig::default()
        };
        let dash = config.dashboard_config();

        assert_eq!(dash.poll_interval, Duration::from_secs(30));
        assert_eq!(dash.route_limit, 50);
        assert_eq!(dash.center_node_id.as_deref(), Some("!abcd"));
        assert!(!dash.show_labels);
        assert!((dash.center_zoom - 13.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_values_fall_back() {
        let config = AppConfig {
            poll_interval_secs: 0,
            route_limit: 0,
            center_node_id: Some("  ".to_string()),
            ..AppConfig::default()
        };
        let dash = config.dashboard_config();

        assert_eq!(dash.poll_interval, Duration::from_secs(10));
        assert_eq!(dash.route_limit, 1000);
        assert!(dash.center_node_id.is_none());
    }

    #[test]
    fn test_request_timeout_tracks_interval() {
        let config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(10) / 3);

        let slow = AppConfig {
            poll_interval_secs: 60,
            ..AppConfig::default()
        };
        assert_eq!(slow.request_timeout(), DEFAULT_REQUEST_TIMEOUT);

        let fast = AppConfig {
            poll_interval_secs: 1,
            ..AppConfig::default()
        };
        assert_eq!(fast.request_timeout(), Duration::from_secs(1));
    }
}
