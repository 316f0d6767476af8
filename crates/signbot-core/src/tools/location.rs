//! Approximate device location via IP geolocation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::tool::{Tool, ToolResult};

/// Geolocation service queried when none is configured
pub const DEFAULT_LOCATION_ENDPOINT: &str = "http://ip-api.com/json";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("location service returned status {0}")]
    Status(u16),

    #[error("location service could not resolve this device: {0}")]
    Unresolved(String),
}

/// Where the device appears to be
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub city: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// ip-api.com response shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    city: String,
    #[serde(default)]
    region_name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
    #[serde(default)]
    timezone: Option<String>,
}

/// `get_location {}`
pub struct GetLocation {
    client: reqwest::Client,
    endpoint: String,
}

impl GetLocation {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_LOCATION_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Query the geolocation service
    pub async fn lookup(&self) -> Result<Location, LocationError> {
        tracing::debug!(endpoint = %self.endpoint, "looking up location");
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LocationError::Status(response.status().as_u16()));
        }

        let geo: GeoResponse = response.json().await?;
        if geo.status.as_deref() == Some("fail") {
            return Err(LocationError::Unresolved(
                geo.message.unwrap_or_else(|| "unknown reason".to_string()),
            ));
        }

        Ok(Location {
            city: geo.city,
            region: geo.region_name,
            country: geo.country,
            latitude: geo.lat,
            longitude: geo.lon,
            timezone: geo.timezone,
        })
    }
}

impl Default for GetLocation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GetLocation {
    fn name(&self) -> &str {
        "get_location"
    }

    fn description(&self) -> &str {
        "Get the approximate location of this device (city, region, country, coordinates)"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _tool_call_id: &str,
        _arguments: serde_json::Value,
        cancel: CancellationToken,
    ) -> ToolResult {
        let result = tokio::select! {
            _ = cancel.cancelled() => return ToolResult::error("Location lookup cancelled"),
            result = self.lookup() => result,
        };

        match result {
            Ok(location) => match serde_json::to_string(&location) {
                Ok(json) => ToolResult::text(json),
                Err(e) => ToolResult::error(format!("Error: {}", e)),
            },
            Err(e) => {
                tracing::warn!("get_location: {}", e);
                ToolResult::error(format!("Error: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_lookup_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "country": "United Kingdom",
                "regionName": "England",
                "city": "London",
                "lat": 51.5,
                "lon": -0.12,
                "timezone": "Europe/London"
            })))
            .mount(&server)
            .await;

        let tool = GetLocation::with_endpoint(format!("{}/json", server.uri()));
        let result = tool
            .execute("c1", json!({}), CancellationToken::new())
            .await;

        assert!(!result.is_error, "{}", result.output);
        let value: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(value["city"], "London");
        assert_eq!(value["region"], "England");
        assert_eq!(value["timezone"], "Europe/London");
    }

    #[tokio::test]
    async fn test_lookup_reported_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "fail",
                "message": "private range"
            })))
            .mount(&server)
            .await;

        let tool = GetLocation::with_endpoint(server.uri());
        let err = tool.lookup().await.unwrap_err();
        assert!(matches!(err, LocationError::Unresolved(ref m) if m == "private range"));
    }

    #[tokio::test]
    async fn test_server_error_becomes_error_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = GetLocation::with_endpoint(server.uri())
            .execute("c1", json!({}), CancellationToken::new())
            .await;
        assert!(result.is_error);
        assert!(result.output.contains("503"));
    }
}
