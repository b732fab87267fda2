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

//! Great-circle distance helpers.
//!
//! Distances are only ever shown to the user (popup text); nothing in the
//! overlay engine makes decisions based on them.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Distance in kilometres to another point.
    #[must_use]
    pub fn distance_km(self, other: LatLon) -> f64 {
        distance_km(self, other)
    }
}

/// Haversine distance between two points in kilometres.
#[must_use]
pub fn distance_km(a: LatLon, b: LatLon) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Sum of segment lengths along an ordered path, in kilometres.
#[must_use]
pub fn path_length_km(points: &[LatLon]) -> f64 {
    points.windows(2).map(|w| distance_km(w[0], w[1])).sum()
}

/// Format a distance the way popups show it.
#[must_use]
pub fn format_km(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.2} km")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = LatLon::new(45.4642, 9.19);
        assert!(distance_km(p, p).abs() < f64::EPSILON);
    }

    #[test]
    fn test_antipodal_half_circumference() {
        let distance = distance_km(LatLon::new(0.0, 0.0), LatLon::new(0.0, 180.0));
        assert!((distance - 20015.0).abs() < 200.0);
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let distance = distance_km(LatLon::new(0.0, 0.0), LatLon::new(0.0, 1.0));
        assert!((distance - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_path_length_sums_segments() {
        let path = [
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 1.0),
            LatLon::new(0.0, 2.0),
        ];
        let direct = distance_km(path[0], path[2]);
        assert!((path_length_km(&path) - direct).abs() < 1e-6);
        assert!(path_length_km(&path[..1]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_km() {
        assert_eq!(format_km(0.25), "250 m");
        assert_eq!(format_km(12.345), "12.35 km");
    }
}
