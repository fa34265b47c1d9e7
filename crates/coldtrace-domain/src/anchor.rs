use crate::alert::{AlertEvent, AlertKind};
use crate::reading::format_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one ledger write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Identity of an anchored alert: the idempotency and reconciliation key.
///
/// Two alerts are the same anchoring obligation exactly when all four
/// components match. The timestamp alone is not enough (two devices can
/// alert in the same instant) and the fingerprint alone is not enough
/// (identical payloads can legitimately recur).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorKey {
    pub device_id: String,
    pub alert_type: String,
    pub timestamp: String,
    pub fingerprint: String,
}

impl AnchorKey {
    pub fn from_event(event: &AlertEvent, fingerprint: &str) -> Self {
        Self {
            device_id: event.device_id.clone(),
            alert_type: event.kind.as_str().to_string(),
            timestamp: format_timestamp(&event.timestamp),
            fingerprint: fingerprint.to_string(),
        }
    }
}

/// Local record of one anchoring attempt: the write-intent side of
/// reconciliation. The ledger's own entries remain the ground truth.
///
/// `timestamp` is stored pre-formatted (RFC 3339, `Z`) because it doubles as
/// a ledger parameter and a reconciliation key component; formatting once at
/// construction removes any chance of two call sites rendering it
/// differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorTransaction {
    pub device_id: String,
    pub alert_type: AlertKind,
    pub timestamp: String,
    pub fingerprint: String,
    pub nonce: Option<u64>,
    pub signed_payload: Option<String>,
    pub status: SubmissionStatus,
    pub tx_id: Option<String>,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl AnchorTransaction {
    /// Record for an attempt that never reached the ledger. No nonce was
    /// consumed and nothing was signed.
    pub fn failed(event: &AlertEvent, fingerprint: &str, reason: impl Into<String>) -> Self {
        Self {
            device_id: event.device_id.clone(),
            alert_type: event.kind,
            timestamp: format_timestamp(&event.timestamp),
            fingerprint: fingerprint.to_string(),
            nonce: None,
            signed_payload: None,
            status: SubmissionStatus::Failed,
            tx_id: None,
            error: Some(reason.into()),
            submitted_at: Utc::now(),
        }
    }

    pub fn key(&self) -> AnchorKey {
        AnchorKey {
            device_id: self.device_id.clone(),
            alert_type: self.alert_type.as_str().to_string(),
            timestamp: self.timestamp.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}
