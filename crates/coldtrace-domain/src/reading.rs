use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Door sensor position reported by a device.
///
/// Firmware revisions disagree on casing ("OPEN", "Open", "open"), so parsing
/// is case-insensitive. An unrecognized label maps to `Unknown` instead of
/// rejecting the reading: a flaky door sensor must not cost us the
/// temperature data riding in the same payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Open,
    Closed,
    Unknown,
}

impl DoorState {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "open" => DoorState::Open,
            "closed" => DoorState::Closed,
            _ => DoorState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
            DoorState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DoorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DoorState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DoorState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(DoorState::from_label(&label))
    }
}

/// One accepted sensor reading.
///
/// `timestamp` is the server's receipt time, not the device clock. Device
/// clocks drift and some units report wildly wrong times after a battery
/// swap, so the server is the single clock authority for everything
/// downstream (alert identity included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub battery_voltage: f64,
    pub door_state: DoorState,
}

/// Render a timestamp exactly as serde serializes it (RFC 3339, `Z` suffix).
///
/// Ledger parameters and reconciliation keys are strings; they must match
/// the serialized reading byte for byte or confirmed alerts would reconcile
/// as missing.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
