use crate::reading::{DoorState, Reading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Readings strictly above this temperature violate the cold chain.
pub const HIGH_TEMP_THRESHOLD_C: f64 = 8.0;
/// Readings strictly below this temperature risk freezing the cargo.
pub const LOW_TEMP_THRESHOLD_C: f64 = -5.0;

/// The safety rules a reading can violate.
///
/// Serialized form is the wire name recorded on the ledger (`HIGH_TEMP`,
/// `LOW_TEMP`, `DOOR_OPEN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    HighTemp,
    LowTemp,
    DoorOpen,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::HighTemp => "HIGH_TEMP",
            AlertKind::LowTemp => "LOW_TEMP",
            AlertKind::DoorOpen => "DOOR_OPEN",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold violation derived from a single reading.
///
/// Carries the source reading so the anchoring path can fingerprint the
/// exact data that fired the rule.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub device_id: String,
    pub kind: AlertKind,
    pub timestamp: DateTime<Utc>,
    pub source_reading: Reading,
}

impl AlertEvent {
    pub fn from_reading(reading: &Reading, kind: AlertKind) -> Self {
        Self {
            device_id: reading.device_id.clone(),
            kind,
            timestamp: reading.timestamp,
            source_reading: reading.clone(),
        }
    }
}

/// Evaluate every safety rule against one reading.
///
/// Stateless: no hysteresis or debounce, so a device oscillating around a
/// threshold produces one alert per reading. Boundary values are compliant
/// (comparisons are strict). A reading can violate several rules at once.
pub fn detect_alerts(reading: &Reading) -> Vec<AlertKind> {
    let mut alerts = Vec::new();
    if reading.temperature_c > HIGH_TEMP_THRESHOLD_C {
        alerts.push(AlertKind::HighTemp);
    }
    if reading.temperature_c < LOW_TEMP_THRESHOLD_C {
        alerts.push(AlertKind::LowTemp);
    }
    if reading.door_state == DoorState::Open {
        alerts.push(AlertKind::DoorOpen);
    }
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature_c: f64, door_state: DoorState) -> Reading {
        Reading {
            device_id: "truck-1".to_string(),
            timestamp: Utc::now(),
            temperature_c,
            humidity_percent: 70.0,
            battery_voltage: 3.9,
            door_state,
        }
    }

    #[test]
    fn nominal_reading_raises_nothing() {
        assert!(detect_alerts(&reading(4.0, DoorState::Closed)).is_empty());
    }

    #[test]
    fn boundary_temperatures_are_compliant() {
        assert!(detect_alerts(&reading(8.0, DoorState::Closed)).is_empty());
        assert!(detect_alerts(&reading(-5.0, DoorState::Closed)).is_empty());
    }

    #[test]
    fn warm_reading_raises_high_temp() {
        assert_eq!(
            detect_alerts(&reading(8.01, DoorState::Closed)),
            vec![AlertKind::HighTemp]
        );
    }

    #[test]
    fn cold_reading_raises_low_temp() {
        assert_eq!(
            detect_alerts(&reading(-5.01, DoorState::Closed)),
            vec![AlertKind::LowTemp]
        );
    }

    #[test]
    fn open_door_raises_door_open() {
        assert_eq!(
            detect_alerts(&reading(4.0, DoorState::Open)),
            vec![AlertKind::DoorOpen]
        );
    }

    #[test]
    fn unknown_door_state_raises_nothing() {
        assert!(detect_alerts(&reading(4.0, DoorState::Unknown)).is_empty());
    }

    #[test]
    fn one_reading_can_raise_several_alerts() {
        assert_eq!(
            detect_alerts(&reading(9.5, DoorState::Open)),
            vec![AlertKind::HighTemp, AlertKind::DoorOpen]
        );
    }

    #[test]
    fn alert_kind_serializes_to_wire_name() {
        assert_eq!(
            serde_json::to_string(&AlertKind::HighTemp).unwrap(),
            "\"HIGH_TEMP\""
        );
        assert_eq!(AlertKind::DoorOpen.to_string(), "DOOR_OPEN");
    }
}
