//! Clock tools: current time and date in a named time zone

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::tool::{Tool, ToolResult};

/// Zone used when the assistant doesn't name one
pub const DEFAULT_TIME_ZONE: &str = "UTC";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("unrecognized time zone '{0}', expected an IANA name such as 'Europe/London'")]
    UnrecognizedTimezone(String),
}

/// Resolve an IANA zone name
pub fn parse_zone(name: &str) -> Result<Tz, ClockError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ClockError::UnrecognizedTimezone(name.to_string()))
}

/// `HH:MM:SS` for `now` in the given zone
pub fn time_in_zone(now: DateTime<Utc>, zone: &str) -> Result<String, ClockError> {
    let tz = parse_zone(zone)?;
    Ok(now.with_timezone(&tz).format("%H:%M:%S").to_string())
}

/// `YYYY-MM-DD` for `now` in the given zone
pub fn date_in_zone(now: DateTime<Utc>, zone: &str) -> Result<String, ClockError> {
    let tz = parse_zone(zone)?;
    Ok(now.with_timezone(&tz).format("%Y-%m-%d").to_string())
}

fn zone_argument(arguments: &serde_json::Value) -> &str {
    arguments
        .get("time_zone")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_TIME_ZONE)
}

fn zone_schema(what: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "time_zone": {
                "type": "string",
                "description": format!("IANA time zone to report the {} in (default UTC)", what)
            }
        }
    })
}

fn into_result(tool: &str, result: Result<String, ClockError>) -> ToolResult {
    match result {
        Ok(value) => ToolResult::text(value),
        Err(e) => {
            tracing::warn!("{}: {}", tool, e);
            ToolResult::error(format!("Error: {}", e))
        }
    }
}

/// `get_time { time_zone }`
pub struct GetTime;

#[async_trait]
impl Tool for GetTime {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Get the current local time (HH:MM:SS) in a time zone"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        zone_schema("time")
    }

    async fn execute(
        &self,
        _tool_call_id: &str,
        arguments: serde_json::Value,
        _cancel: CancellationToken,
    ) -> ToolResult {
        into_result(
            self.name(),
            time_in_zone(Utc::now(), zone_argument(&arguments)),
        )
    }
}

/// `get_date { time_zone }`
pub struct GetDate;

#[async_trait]
impl Tool for GetDate {
    fn name(&self) -> &str {
        "get_date"
    }

    fn description(&self) -> &str {
        "Get the current local date (YYYY-MM-DD) in a time zone"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        zone_schema("date")
    }

    async fn execute(
        &self,
        _tool_call_id: &str,
        arguments: serde_json::Value,
        _cancel: CancellationToken,
    ) -> ToolResult {
        into_result(
            self.name(),
            date_in_zone(Utc::now(), zone_argument(&arguments)),
        )
    }
}
