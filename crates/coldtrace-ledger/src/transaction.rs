use coldtrace_domain::alert::AlertEvent;
use coldtrace_domain::reading::format_timestamp;
use serde::{Deserialize, Serialize};

/// Contract method invoked for every anchored alert.
pub const STORE_ALERT_METHOD: &str = "storeAlert";

/// Alert fields as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertParams {
    pub device_id: String,
    pub alert_type: String,
    pub timestamp: String,
    pub fingerprint: String,
}

impl AlertParams {
    pub fn from_event(event: &AlertEvent, fingerprint: &str) -> Self {
        Self {
            device_id: event.device_id.clone(),
            alert_type: event.kind.as_str().to_string(),
            timestamp: format_timestamp(&event.timestamp),
            fingerprint: fingerprint.to_string(),
        }
    }
}

/// The exact structure that gets canonicalized and signed. Field order does
/// not matter on the wire; signing always goes through the canonical JSON
/// form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedEnvelope {
    pub account: String,
    pub nonce: u64,
    /// Target contract on the ledger.
    pub contract: String,
    pub method: String,
    pub params: AlertParams,
}

/// A signed envelope ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    #[serde(flatten)]
    pub envelope: UnsignedEnvelope,
    /// Hex-encoded ECDSA signature over the canonical digest.
    pub signature: String,
}
