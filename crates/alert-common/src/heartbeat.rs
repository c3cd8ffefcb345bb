use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub component_name: String,
    pub is_alive: bool,
    pub timestamp: f64,
}

impl Heartbeat {
    pub fn alive(component_name: impl Into<String>, timestamp: f64) -> Self {
        Self {
            component_name: component_name.into(),
            is_alive: true,
            timestamp,
        }
    }
}

/// Seconds since the unix epoch as a float, the timestamp unit used on the bus.
pub fn unix_timestamp(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn serializes_with_wire_field_names() {
        let heartbeat = Heartbeat::alive("Alert Store", 1234.5);
        let encoded = serde_json::to_value(&heartbeat);
        assert!(encoded.is_ok());
        let Ok(encoded) = encoded else { return };

        assert_eq!(
            encoded,
            serde_json::json!({
                "component_name": "Alert Store",
                "is_alive": true,
                "timestamp": 1234.5,
            })
        );
    }

    #[test]
    fn converts_system_time_to_float_seconds() {
        let at = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(unix_timestamp(at), 1.5);
    }
}
