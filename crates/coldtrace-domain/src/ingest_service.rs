use crate::alert::{detect_alerts, AlertEvent, AlertKind};
use crate::anchor::SubmissionStatus;
use crate::error::DomainResult;
use crate::reading::{DoorState, Reading};
use crate::repository::{AnchorLog, AnchorWriter, ReadingStore};
use crate::validate::validate_struct;
use chrono::Utc;
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Inbound telemetry submission, exactly the fields a device sends.
///
/// The device timestamp is required in the payload but only states intent;
/// the server clock overwrites it at acceptance. It stays a free-form string
/// here because drifted or garbled device clocks must not reject otherwise
/// good sensor data.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReadingSubmission {
    #[garde(length(min = 1))]
    pub device_id: String,
    #[garde(skip)]
    pub timestamp: String,
    #[garde(skip)]
    pub temperature_c: f64,
    #[garde(skip)]
    pub humidity_percent: f64,
    #[garde(skip)]
    pub battery_voltage: f64,
    #[garde(skip)]
    pub door_state: DoorState,
}

/// Per-alert anchoring outcome reported back to the submitter.
#[derive(Debug, Clone, Serialize)]
pub struct AnchoredAlert {
    pub alert_type: AlertKind,
    pub fingerprint: String,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the caller gets back for an accepted reading.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub record_id: u64,
    pub reading: Reading,
    pub alerts: Vec<AnchoredAlert>,
}

/// Telemetry acceptance path.
///
/// Validate, stamp server time, append durably, evaluate alert rules,
/// anchor each alert. The durable append is the point of acceptance:
/// everything after it reports its outcome in the receipt instead of
/// failing the request.
pub struct TelemetryIngestService {
    reading_store: Arc<dyn ReadingStore>,
    anchor_writer: Arc<dyn AnchorWriter>,
    anchor_log: Arc<dyn AnchorLog>,
}

impl TelemetryIngestService {
    pub fn new(
        reading_store: Arc<dyn ReadingStore>,
        anchor_writer: Arc<dyn AnchorWriter>,
        anchor_log: Arc<dyn AnchorLog>,
    ) -> Self {
        Self {
            reading_store,
            anchor_writer,
            anchor_log,
        }
    }

    #[instrument(skip(self, submission), fields(device_id = %submission.device_id))]
    pub async fn ingest(&self, submission: ReadingSubmission) -> DomainResult<IngestReceipt> {
        validate_struct(&submission)?;

        let reading = Reading {
            device_id: submission.device_id,
            timestamp: Utc::now(),
            temperature_c: submission.temperature_c,
            humidity_percent: submission.humidity_percent,
            battery_voltage: submission.battery_voltage,
            door_state: submission.door_state,
        };

        let record_id = self.reading_store.append(reading.clone()).await?;
        debug!(record_id, "reading accepted");

        let mut alerts = Vec::new();
        for kind in detect_alerts(&reading) {
            let event = AlertEvent::from_reading(&reading, kind);
            alerts.push(self.anchor_alert(&event).await);
        }

        if !alerts.is_empty() {
            info!(alert_count = alerts.len(), "alerts raised and anchored");
        }

        Ok(IngestReceipt {
            record_id,
            reading,
            alerts,
        })
    }

    /// Anchor one alert and record the attempt. Every failure mode is folded
    /// into the returned outcome; acceptance already happened.
    async fn anchor_alert(&self, event: &AlertEvent) -> AnchoredAlert {
        let transaction = self.anchor_writer.anchor(event).await;

        if transaction.status == SubmissionStatus::Failed {
            warn!(
                alert_type = %transaction.alert_type,
                error = transaction.error.as_deref().unwrap_or("unknown"),
                "alert anchoring failed"
            );
        }

        if let Err(err) = self.anchor_log.record(transaction.clone()).await {
            warn!(alert_type = %transaction.alert_type, "failed to record anchor attempt: {err}");
        }

        AnchoredAlert {
            alert_type: transaction.alert_type,
            fingerprint: transaction.fingerprint,
            status: transaction.status,
            tx_id: transaction.tx_id,
            error: transaction.error,
        }
    }
}
