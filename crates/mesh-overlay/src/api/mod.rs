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

//! Backend wire records and boundary validation.
//!
//! The backend returns loosely-typed JSON. Each array element is parsed on its
//! own by [`parse_records`], so one malformed element never costs the whole
//! batch. Records are then converted into [`Node`] and [`Route`]; records
//! missing identity fields are rejected with a [`RecordError`] and skipped by
//! the batch decoders.

mod client;

pub use client::{ApiClient, ApiError, DEFAULT_REQUEST_TIMEOUT};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::geo::LatLon;
use crate::model::{Node, RadioMetrics, Route, Transport};

/// Errors raised while converting a wire record into a model entity.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid coordinate for node {node_id}: ({lat}, {lon})")]
    InvalidCoordinate { node_id: String, lat: f64, lon: f64 },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(f64),
}

/// One element of `GET /api/nodes`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeRecord {
    pub node_id: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub nickname: Option<String>,
    /// Unix seconds.
    pub last_seen: Option<f64>,
}

/// One element of `GET /api/traceroutes`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TracerouteRecord {
    pub src_id: Option<String>,
    pub dest_id: Option<String>,
    pub route: Option<Vec<Option<String>>>,
    pub hop_count: Option<i64>,
    /// Unix seconds.
    pub ts: Option<f64>,
    pub via: Option<String>,
    /// Either an object or a JSON-encoded object string.
    pub radio: Option<serde_json::Value>,
}

/// Parse each element of a JSON array body independently, skipping elements
/// that do not match the record shape.
#[must_use]
pub fn parse_records<T: DeserializeOwned>(kind: &str, values: Vec<serde_json::Value>) -> Vec<T> {
    let total = values.len();
    let records: Vec<T> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {} record: {}", kind, e);
                None
            }
        })
        .collect();
    if records.len() < total {
        warn!("Parsed {} of {} {} records", records.len(), total, kind);
    }
    records
}

fn radio_fields(radio: serde_json::Value) -> BTreeMap<String, serde_json::Value> {
    match radio {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        serde_json::Value::String(text) => match serde_json::from_str(&text) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        },
        _ => BTreeMap::new(),
    }
}

fn required_id(value: Option<String>, field: &'static str) -> Result<String, RecordError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(RecordError::MissingField(field))
}

fn timestamp_from_secs(secs: f64) -> Result<DateTime<Utc>, RecordError> {
    if !secs.is_finite() {
        return Err(RecordError::InvalidTimestamp(secs));
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "finite seconds split into whole seconds and sub-second nanos"
    )]
    let (whole, nanos) = (secs.floor() as i64, ((secs - secs.floor()) * 1e9) as u32);
    DateTime::from_timestamp(whole, nanos).ok_or(RecordError::InvalidTimestamp(secs))
}

impl TryFrom<NodeRecord> for Node {
    type Error = RecordError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        let id = required_id(record.node_id, "node_id")?;

        let position = match (record.lat, record.lon) {
            (Some(lat), Some(lon)) => {
                let valid = lat.is_finite()
                    && lon.is_finite()
                    && (-90.0..=90.0).contains(&lat)
                    && (-180.0..=180.0).contains(&lon);
                if !valid {
                    return Err(RecordError::InvalidCoordinate { node_id: id, lat, lon });
                }
                Some(LatLon::new(lat, lon))
            }
            _ => None,
        };

        let mut node = Node::new(
            id,
            record.nickname.as_deref(),
            record.long_name.as_deref(),
            record.short_name.as_deref(),
        );
        node.position = position;
        node.altitude = record.alt.filter(|a| a.is_finite());
        node.last_seen_at = record.last_seen.and_then(|s| timestamp_from_secs(s).ok());
        Ok(node)
    }
}

impl TryFrom<TracerouteRecord> for Route {
    type Error = RecordError;

    fn try_from(record: TracerouteRecord) -> Result<Self, Self::Error> {
        let source_id = required_id(record.src_id, "src_id")?;
        let dest_id = required_id(record.dest_id, "dest_id")?;
        let timestamp = timestamp_from_secs(record.ts.ok_or(RecordError::MissingField("ts"))?)?;

        let hops: Vec<String> = record.route.unwrap_or_default().into_iter().flatten().collect();
        let hop_count = record
            .hop_count
            .and_then(|h| u32::try_from(h).ok())
            .unwrap_or_else(|| u32::try_from(hops.len()).unwrap_or(u32::MAX));

        let radio_metrics: Option<RadioMetrics> = record
            .radio
            .map(|radio| {
                radio_fields(radio)
                    .into_iter()
                    .filter_map(|(k, v)| v.as_f64().map(|v| (k, v)))
                    .collect::<RadioMetrics>()
            })
            .filter(|m| !m.is_empty());

        Ok(Route {
            source_id,
            dest_id,
            hop_count,
            hops,
            timestamp,
            transport: Transport::from_via(record.via.as_deref()),
            radio_metrics,
        })
    }
}

/// Convert a node batch, skipping invalid records.
#[must_use]
pub fn decode_nodes(records: Vec<NodeRecord>) -> Vec<Node> {
    records
        .into_iter()
        .filter_map(|record| match Node::try_from(record) {
            Ok(node) => Some(node),
            Err(e) => {
                warn!("Skipping node record: {}", e);
                None
            }
        })
        .collect()
}

/// Convert a traceroute batch, skipping invalid records.
#[must_use]
pub fn decode_routes(records: Vec<TracerouteRecord>) -> Vec<Route> {
    records
        .into_iter()
        .filter_map(|record| match Route::try_from(record) {
            Ok(route) => Some(route),
            Err(e) => {
                warn!("Skipping traceroute record: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_node_batch() {
        let json = r#"[
            {"node_id": "!a1", "lat": 45.1, "lon": 9.2, "alt": 120, "short_name": "A1",
             "long_name": "Alpha", "nickname": null, "last_seen": 1700000000},
            {"node_id": "!b2", "lat": null, "lon": null},
            {"lat": 1.0, "lon": 2.0},
            {"node_id": "", "lat": 1.0, "lon": 2.0}
        ]"#;
        let records: Vec<NodeRecord> = serde_json::from_str(json).unwrap();
        let nodes = decode_nodes(records);

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].display_name, "Alpha");
        assert_eq!(nodes[0].short_label, "A1");
        assert_eq!(nodes[0].position, Some(LatLon::new(45.1, 9.2)));
        assert_eq!(nodes[0].altitude, Some(120.0));
        assert_eq!(
            nodes[0].last_seen_at,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert_eq!(nodes[1].position, None);
    }

    #[test]
    fn test_out_of_range_coordinate_rejected() {
        let record = NodeRecord {
            node_id: Some("!c3".to_string()),
            lat: Some(91.0),
            lon: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            Node::try_from(record),
            Err(RecordError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_decode_traceroute() {
        let json = r#"{"src_id": "!a1", "dest_id": "!b2", "route": ["!c3", null, "!d4"],
                       "hop_count": 2, "ts": 1700000000.5, "via": "mqtt",
                       "radio": {"snr": 7.25, "rssi": -97, "note": "x"}}"#;
        let record: TracerouteRecord = serde_json::from_str(json).unwrap();
        let route = Route::try_from(record).unwrap();

        assert_eq!(route.hops, vec!["!c3", "!d4"]);
        assert_eq!(route.hop_count, 2);
        assert_eq!(route.transport, Transport::Relay);
        let metrics = route.radio_metrics.unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.get("rssi"), Some(&-97.0));
        assert_eq!(route.timestamp.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_traceroute_missing_identity_skipped() {
        let records: Vec<TracerouteRecord> = serde_json::from_str(
            r#"[{"dest_id": "!b2", "ts": 1}, {"src_id": "!a1", "ts": 1},
                {"src_id": "!a1", "dest_id": "!b2"}, {"src_id": "!a1", "dest_id": "!b2", "ts": 1}]"#,
        )
        .unwrap();
        let routes = decode_routes(records);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].hop_count, 0);
        assert!(routes[0].radio_metrics.is_none());
    }

    #[test]
    fn test_negative_hop_count_falls_back_to_route_length() {
        let record = TracerouteRecord {
            src_id: Some("!a1".to_string()),
            dest_id: Some("!b2".to_string()),
            route: Some(vec![Some("!c3".to_string())]),
            hop_count: Some(-1),
            ts: Some(1.0),
            ..Default::default()
        };
        assert_eq!(Route::try_from(record).unwrap().hop_count, 1);
    }

    #[test]
    fn test_malformed_element_does_not_drop_batch() {
        let values: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                {"src_id": "!a1", "dest_id": "!b2", "route": [], "hop_count": 0, "ts": 1.0},
                {"src_id": "!b2", "dest_id": "!a1", "route": null, "hop_count": 1, "ts": 2.0},
                {"src_id": "!c3", "dest_id": "!a1", "route": [], "hop_count": "two", "ts": 3.0},
                "garbage"
            ]"#,
        )
        .unwrap();
        let records: Vec<TracerouteRecord> = parse_records("traceroute", values);
        assert_eq!(records.len(), 2);

        let routes = decode_routes(records);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].source_id, "!a1");
        assert_eq!(routes[1].source_id, "!b2");
        assert!(routes[1].hops.is_empty());
    }

    #[test]
    fn test_malformed_node_element_skipped() {
        let values: Vec<serde_json::Value> = serde_json::from_str(
            r#"[{"node_id": "!a1", "lat": "north", "lon": 9.2}, {"node_id": "!b2", "lat": 1.0, "lon": 2.0}]"#,
        )
        .unwrap();
        let nodes = decode_nodes(parse_records("node", values));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "!b2");
    }

    #[test]
    fn test_radio_encoded_as_string() {
        let record: TracerouteRecord = serde_json::from_str(
            r#"{"src_id": "!a1", "dest_id": "!b2", "ts": 1, "radio": "{\"snr\": 5.5}"}"#,
        )
        .unwrap();
        let metrics = Route::try_from(record).unwrap().radio_metrics.unwrap();
        assert_eq!(metrics.get("snr"), Some(&5.5));
    }
}
