use crate::anchor::AnchorKey;
use serde::{Deserialize, Serialize};

/// Read-only projection of one alert exactly as the ledger recorded it.
///
/// `alert_type` and `timestamp` stay raw strings: other writers may have
/// recorded values that do not parse into this system's types, and the
/// projection must surface them rather than drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub index: u64,
    pub device_id: String,
    pub alert_type: String,
    pub timestamp: String,
    pub fingerprint: String,
}

impl LedgerEntry {
    pub fn key(&self) -> AnchorKey {
        AnchorKey {
            device_id: self.device_id.clone(),
            alert_type: self.alert_type.clone(),
            timestamp: self.timestamp.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}
