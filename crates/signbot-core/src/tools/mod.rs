//! Built-in functions the assistant can call

mod clock;
mod location;

pub use clock::{
    ClockError, DEFAULT_TIME_ZONE, GetDate, GetTime, date_in_zone, parse_zone, time_in_zone,
};
pub use location::{DEFAULT_LOCATION_ENDPOINT, GetLocation, Location, LocationError};

use std::sync::Arc;

use crate::tool::ToolRegistry;

/// Registry with the clock tools, plus `get_location` when an endpoint is given
pub fn default_registry(location_endpoint: Option<&str>) -> ToolRegistry {
    let mut registry = ToolRegistry::new()
        .with(Arc::new(GetTime))
        .with(Arc::new(GetDate));
    if let Some(endpoint) = location_endpoint {
        registry.register(Arc::new(GetLocation::with_endpoint(endpoint)));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        assert_eq!(default_registry(None).names(), vec!["get_date", "get_time"]);
        assert_eq!(
            default_registry(Some(DEFAULT_LOCATION_ENDPOINT)).names(),
            vec!["get_date", "get_location", "get_time"]
        );
    }
}
