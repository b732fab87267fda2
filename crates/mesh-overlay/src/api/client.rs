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

//! Async HTTP client for the mesh backend.

use std::time::Duration;

use log::debug;
use thiserror::Error;

use super::{parse_records, NodeRecord, TracerouteRecord};

/// Per-request timeout, kept below the default poll interval.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Errors from backend requests.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
}

impl ApiError {
    fn http(endpoint: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ApiError::Http { endpoint, source }
    }
}

/// Client for the three backend endpoints the dashboard consumes.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::http("client"))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/nodes`
    pub async fn fetch_nodes(&self) -> Result<Vec<NodeRecord>, ApiError> {
        const ENDPOINT: &str = "/api/nodes";
        let response = self
            .http
            .get(self.url(ENDPOINT))
            .send()
            .await
            .map_err(ApiError::http(ENDPOINT))?;
        check_status(ENDPOINT, &response)?;
        let values: Vec<serde_json::Value> =
            response.json().await.map_err(ApiError::http(ENDPOINT))?;
        let nodes: Vec<NodeRecord> = parse_records("node", values);
        debug!("Fetched {} node records", nodes.len());
        Ok(nodes)
    }

    /// `GET /api/traceroutes?limit=N`
    pub async fn fetch_traceroutes(&self, limit: u32) -> Result<Vec<TracerouteRecord>, ApiError> {
        const ENDPOINT: &str = "/api/traceroutes";
        let response = self
            .http
            .get(self.url(ENDPOINT))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(ApiError::http(ENDPOINT))?;
        check_status(ENDPOINT, &response)?;
        let values: Vec<serde_json::Value> =
            response.json().await.map_err(ApiError::http(ENDPOINT))?;
        let routes: Vec<TracerouteRecord> = parse_records("traceroute", values);
        debug!("Fetched {} traceroute records", routes.len());
        Ok(routes)
    }

    /// `DELETE /api/traceroutes`
    pub async fn clear_traceroutes(&self) -> Result<(), ApiError> {
        const ENDPOINT: &str = "/api/traceroutes";
        let response = self
            .http
            .delete(self.url(ENDPOINT))
            .send()
            .await
            .map_err(ApiError::http(ENDPOINT))?;
        check_status(ENDPOINT, &response)
    }
}

fn check_status(endpoint: &'static str, response: &reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::Status {
            endpoint,
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://mesh.local:8080/").unwrap();
        assert_eq!(client.base_url(), "http://mesh.local:8080");
        assert_eq!(client.url("/api/nodes"), "http://mesh.local:8080/api/nodes");
    }

    #[test]
    fn test_status_error_message() {
        let err = ApiError::Status {
            endpoint: "/api/traceroutes",
            status: 503,
        };
        assert_eq!(err.to_string(), "/api/traceroutes returned HTTP 503");
    }
}
