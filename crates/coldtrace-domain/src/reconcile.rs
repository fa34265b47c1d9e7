use crate::anchor::{AnchorKey, AnchorTransaction, SubmissionStatus};
use crate::error::DomainResult;
use crate::ledger_entry::LedgerEntry;
use crate::repository::{AnchorLog, LedgerReader};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of comparing local anchor attempts against ledger truth.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub confirmed: Vec<AnchorTransaction>,
    pub missing: Vec<AnchorTransaction>,
    pub extra: Vec<LedgerEntry>,
}

/// Classify local transactions against the ledger's canonical entries.
///
/// Matching is counted, not set-based: each local transaction consumes one
/// ledger entry with the same key, so two local records of the same alert
/// need two ledger entries before both confirm. Unmatched local
/// transactions younger than `grace` are still in flight and appear in
/// neither list. Unmatched ledger entries are `extra`, which is not an
/// error: another writer may share the ledger, or this service lost its
/// local log in a restart.
///
/// A locally-failed transaction that matches a ledger entry confirms like
/// any other. That case is real: a submission can land and the
/// confirmation response still get lost.
pub fn reconcile(
    local: &[AnchorTransaction],
    ledger: &[LedgerEntry],
    grace: Duration,
    now: DateTime<Utc>,
) -> ReconciliationReport {
    let mut unmatched: HashMap<AnchorKey, Vec<usize>> = HashMap::new();
    for (position, entry) in ledger.iter().enumerate() {
        unmatched.entry(entry.key()).or_default().push(position);
    }

    let mut confirmed = Vec::new();
    let mut missing = Vec::new();
    for transaction in local {
        let matched = unmatched
            .get_mut(&transaction.key())
            .and_then(|positions| (!positions.is_empty()).then(|| positions.remove(0)));

        match matched {
            Some(_) => {
                let mut confirmed_tx = transaction.clone();
                confirmed_tx.status = SubmissionStatus::Confirmed;
                confirmed.push(confirmed_tx);
            }
            None if now.signed_duration_since(transaction.submitted_at) >= grace => {
                missing.push(transaction.clone());
            }
            // Unmatched but inside the grace window: still in flight.
            None => {}
        }
    }

    let mut extra: Vec<LedgerEntry> = unmatched
        .into_values()
        .flatten()
        .map(|position| ledger[position].clone())
        .collect();
    extra.sort_by_key(|entry| entry.index);

    ReconciliationReport {
        confirmed,
        missing,
        extra,
    }
}

/// Audits the local anchor log against the full ledger.
pub struct ReconciliationService {
    anchor_log: Arc<dyn AnchorLog>,
    ledger_reader: Arc<dyn LedgerReader>,
    grace: Duration,
}

impl ReconciliationService {
    pub fn new(
        anchor_log: Arc<dyn AnchorLog>,
        ledger_reader: Arc<dyn LedgerReader>,
        grace: Duration,
    ) -> Self {
        Self {
            anchor_log,
            ledger_reader,
            grace,
        }
    }

    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> DomainResult<ReconciliationReport> {
        let local = self.anchor_log.read_all().await?;
        let ledger = self.ledger_reader.all_entries().await?;

        let report = reconcile(&local, &ledger, self.grace, Utc::now());
        if !report.extra.is_empty() {
            warn!(
                extra = report.extra.len(),
                "ledger entries with no local record; local audit trail may be incomplete"
            );
        }
        info!(
            confirmed = report.confirmed.len(),
            missing = report.missing.len(),
            extra = report.extra.len(),
            "reconciliation complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertKind;
    use crate::error::DomainError;
    use crate::repository::{MockAnchorLog, MockLedgerReader};

    fn transaction(
        device_id: &str,
        kind: AlertKind,
        timestamp: &str,
        fingerprint: &str,
        age_secs: i64,
    ) -> AnchorTransaction {
        AnchorTransaction {
            device_id: device_id.to_string(),
            alert_type: kind,
            timestamp: timestamp.to_string(),
            fingerprint: fingerprint.to_string(),
            nonce: Some(1),
            signed_payload: Some("sig".to_string()),
            status: SubmissionStatus::Pending,
            tx_id: Some("tx".to_string()),
            error: None,
            submitted_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    fn entry(
        index: u64,
        device_id: &str,
        alert_type: &str,
        timestamp: &str,
        fingerprint: &str,
    ) -> LedgerEntry {
        LedgerEntry {
            index,
            device_id: device_id.to_string(),
            alert_type: alert_type.to_string(),
            timestamp: timestamp.to_string(),
            fingerprint: fingerprint.to_string(),
        }
    }

    const GRACE_SECS: i64 = 120;

    fn grace() -> Duration {
        Duration::seconds(GRACE_SECS)
    }

    #[test]
    fn matching_entry_confirms_the_transaction() {
        let local = vec![transaction(
            "truck-1",
            AlertKind::HighTemp,
            "2025-06-01T12:00:00Z",
            "fp1",
            600,
        )];
        let ledger = vec![entry(0, "truck-1", "HIGH_TEMP", "2025-06-01T12:00:00Z", "fp1")];

        let report = reconcile(&local, &ledger, grace(), Utc::now());

        assert_eq!(report.confirmed.len(), 1);
        assert_eq!(report.confirmed[0].status, SubmissionStatus::Confirmed);
        assert!(report.missing.is_empty());
        assert!(report.extra.is_empty());
    }

    #[test]
    fn unmatched_old_transaction_is_missing() {
        let local = vec![transaction(
            "truck-1",
            AlertKind::HighTemp,
            "2025-06-01T12:00:00Z",
            "fp1",
            600,
        )];

        let report = reconcile(&local, &[], grace(), Utc::now());

        assert!(report.confirmed.is_empty());
        assert_eq!(report.missing.len(), 1);
    }

    #[test]
    fn unmatched_fresh_transaction_is_still_in_flight() {
        let local = vec![transaction(
            "truck-1",
            AlertKind::HighTemp,
            "2025-06-01T12:00:00Z",
            "fp1",
            10,
        )];

        let report = reconcile(&local, &[], grace(), Utc::now());

        assert!(report.confirmed.is_empty());
        assert!(report.missing.is_empty());
    }

    #[test]
    fn unmatched_ledger_entry_is_extra() {
        let ledger = vec![entry(4, "truck-9", "DOOR_OPEN", "2025-06-01T12:00:00Z", "fp9")];

        let report = reconcile(&[], &ledger, grace(), Utc::now());

        assert_eq!(report.extra.len(), 1);
        assert_eq!(report.extra[0].index, 4);
    }

    #[test]
    fn duplicate_transactions_need_matching_multiplicity() {
        let tx = transaction(
            "truck-1",
            AlertKind::HighTemp,
            "2025-06-01T12:00:00Z",
            "fp1",
            600,
        );
        let local = vec![tx.clone(), tx];
        let ledger = vec![entry(0, "truck-1", "HIGH_TEMP", "2025-06-01T12:00:00Z", "fp1")];

        let report = reconcile(&local, &ledger, grace(), Utc::now());

        assert_eq!(report.confirmed.len(), 1);
        assert_eq!(report.missing.len(), 1);
        assert!(report.extra.is_empty());
    }

    #[test]
    fn locally_failed_transaction_confirms_when_the_ledger_has_it() {
        let mut tx = transaction(
            "truck-1",
            AlertKind::HighTemp,
            "2025-06-01T12:00:00Z",
            "fp1",
            600,
        );
        tx.status = SubmissionStatus::Failed;
        tx.error = Some("timeout".to_string());
        let ledger = vec![entry(0, "truck-1", "HIGH_TEMP", "2025-06-01T12:00:00Z", "fp1")];

        let report = reconcile(&[tx], &ledger, grace(), Utc::now());

        assert_eq!(report.confirmed.len(), 1);
        assert_eq!(report.confirmed[0].status, SubmissionStatus::Confirmed);
    }

    #[test]
    fn key_mismatch_in_any_component_breaks_the_match() {
        let local = vec![transaction(
            "truck-1",
            AlertKind::HighTemp,
            "2025-06-01T12:00:00Z",
            "fp1",
            600,
        )];
        let ledger = vec![entry(0, "truck-1", "HIGH_TEMP", "2025-06-01T12:00:00Z", "fp2")];

        let report = reconcile(&local, &ledger, grace(), Utc::now());

        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.extra.len(), 1);
    }

    #[tokio::test]
    async fn service_combines_log_and_ledger() {
        let mut log = MockAnchorLog::new();
        log.expect_read_all().returning(|| {
            Ok(vec![transaction(
                "truck-1",
                AlertKind::HighTemp,
                "2025-06-01T12:00:00Z",
                "fp1",
                600,
            )])
        });
        let mut reader = MockLedgerReader::new();
        reader.expect_all_entries().returning(|| {
            Ok(vec![entry(
                0,
                "truck-1",
                "HIGH_TEMP",
                "2025-06-01T12:00:00Z",
                "fp1",
            )])
        });

        let service =
            ReconciliationService::new(Arc::new(log), Arc::new(reader), grace());
        let report = service.reconcile().await.unwrap();

        assert_eq!(report.confirmed.len(), 1);
        assert!(report.missing.is_empty());
    }

    #[tokio::test]
    async fn unreachable_ledger_propagates() {
        let mut log = MockAnchorLog::new();
        log.expect_read_all().returning(|| Ok(Vec::new()));
        let mut reader = MockLedgerReader::new();
        reader.expect_all_entries().returning(|| {
            Err(DomainError::LedgerUnavailable("connection refused".to_string()))
        });

        let service =
            ReconciliationService::new(Arc::new(log), Arc::new(reader), grace());
        let err = service.reconcile().await.unwrap_err();

        assert!(matches!(err, DomainError::LedgerUnavailable(_)));
    }
}
