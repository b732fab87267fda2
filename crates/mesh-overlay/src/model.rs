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

//! Typed mesh entities.
//!
//! Wire records from the backend are validated into these types at the
//! boundary (see [`crate::api`]); nothing downstream handles partial records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::geo::LatLon;

/// One mesh radio device.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable node identifier (e.g. `!a1b2c3d4`).
    pub id: String,
    /// Last known location fix.
    pub position: Option<LatLon>,
    /// Altitude in metres.
    pub altitude: Option<f64>,
    /// Resolved from nickname, long name, short name, then id.
    pub display_name: String,
    /// Text drawn inside the on-map marker.
    pub short_label: String,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Build a node, resolving display name and label from the optional names.
    #[must_use]
    pub fn new(
        id: String,
        nickname: Option<&str>,
        long_name: Option<&str>,
        short_name: Option<&str>,
    ) -> Self {
        let display_name = resolve_display_name(&id, nickname, long_name, short_name);
        let short_label = resolve_short_label(&id, short_name);
        Self {
            id,
            position: None,
            altitude: None,
            display_name,
            short_label,
            last_seen_at: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: LatLon) -> Self {
        self.position = Some(position);
        self
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Display name priority: nickname, long name, short name, id.
#[must_use]
pub fn resolve_display_name(
    id: &str,
    nickname: Option<&str>,
    long_name: Option<&str>,
    short_name: Option<&str>,
) -> String {
    non_empty(nickname)
        .or_else(|| non_empty(long_name))
        .or_else(|| non_empty(short_name))
        .unwrap_or(id)
        .to_string()
}

/// Short name, else the last four characters of the id.
#[must_use]
pub fn resolve_short_label(id: &str, short_name: Option<&str>) -> String {
    if let Some(short) = non_empty(short_name) {
        return short.to_string();
    }
    let chars: Vec<char> = id.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

/// How a traceroute reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Heard over the air.
    #[default]
    Radio,
    /// Forwarded through an MQTT relay.
    Relay,
}

impl Transport {
    /// Parse the wire `via` tag. Anything other than `mqtt` is radio.
    #[must_use]
    pub fn from_via(via: Option<&str>) -> Self {
        match via.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("mqtt") => Transport::Relay,
            _ => Transport::Radio,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Transport::Radio => "LoRa",
            Transport::Relay => "MQTT",
        }
    }
}

/// Numeric signal attributes reported with a traceroute (snr, rssi, ...).
pub type RadioMetrics = BTreeMap<String, f64>;

/// One observed multi-hop path.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub source_id: String,
    pub dest_id: String,
    pub hop_count: u32,
    /// Intermediate node ids between source and destination.
    pub hops: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub transport: Transport,
    pub radio_metrics: Option<RadioMetrics>,
}

/// Identity of a route record across rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub source_id: String,
    pub dest_id: String,
    pub timestamp: DateTime<Utc>,
    pub hops: Vec<String>,
}

impl Route {
    /// `[source, ...hops, dest]` with empty ids dropped.
    ///
    /// Some backends report hops including both endpoints, so consecutive
    /// repeats collapse into one entry.
    #[must_use]
    pub fn full_path(&self) -> Vec<&str> {
        let mut path: Vec<&str> = std::iter::once(self.source_id.as_str())
            .chain(self.hops.iter().map(String::as_str))
            .chain(std::iter::once(self.dest_id.as_str()))
            .filter(|id| !id.is_empty())
            .collect();
        path.dedup();
        path
    }

    /// Whether the node appears anywhere on the path.
    #[must_use]
    pub fn passes_through(&self, node_id: &str) -> bool {
        !node_id.is_empty() && self.full_path().contains(&node_id)
    }

    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey {
            source_id: self.source_id.clone(),
            dest_id: self.dest_id.clone(),
            timestamp: self.timestamp,
            hops: self.hops.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(src: &str, hops: &[&str], dest: &str) -> Route {
        Route {
            source_id: src.to_string(),
            dest_id: dest.to_string(),
            hop_count: u32::try_from(hops.len()).unwrap(),
            hops: hops.iter().map(ToString::to_string).collect(),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            transport: Transport::Radio,
            radio_metrics: None,
        }
    }

    #[test]
    fn test_display_name_priority() {
        assert_eq!(resolve_display_name("!1", Some("Nick"), Some("Long"), Some("S")), "Nick");
        assert_eq!(resolve_display_name("!1", Some("  "), Some("Long"), Some("S")), "Long");
        assert_eq!(resolve_display_name("!1", None, None, Some("S")), "S");
        assert_eq!(resolve_display_name("!1", None, None, None), "!1");
    }

    #[test]
    fn test_short_label_falls_back_to_id_suffix() {
        assert_eq!(resolve_short_label("!a1b2c3d4", Some("GW")), "GW");
        assert_eq!(resolve_short_label("!a1b2c3d4", None), "c3d4");
        assert_eq!(resolve_short_label("ab", None), "ab");
    }

    #[test]
    fn test_full_path_skips_empty_ids() {
        let r = route("A", &["", "C"], "B");
        assert_eq!(r.full_path(), vec!["A", "C", "B"]);
        assert!(r.passes_through("C"));
        assert!(!r.passes_through(""));
        assert!(!r.passes_through("D"));
    }

    #[test]
    fn test_full_path_collapses_repeated_endpoints() {
        let r = route("A", &["A", "C", "B"], "B");
        assert_eq!(r.full_path(), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_transport_from_via() {
        assert_eq!(Transport::from_via(Some("MQTT")), Transport::Relay);
        assert_eq!(Transport::from_via(Some("lora")), Transport::Radio);
        assert_eq!(Transport::from_via(None), Transport::Radio);
        assert_eq!(Transport::Relay.label(), "MQTT");
    }
}
