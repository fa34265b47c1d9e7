use crate::anchor::AnchorTransaction;
use crate::error::DomainResult;
use crate::repository::AnchorLog;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process log of anchor attempts.
///
/// Reconciliation against the ledger reconstructs anything lost on restart,
/// so this log does not need to survive one.
#[derive(Clone, Default)]
pub struct InMemoryAnchorLog {
    transactions: Arc<RwLock<Vec<AnchorTransaction>>>,
}

impl InMemoryAnchorLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnchorLog for InMemoryAnchorLog {
    async fn record(&self, transaction: AnchorTransaction) -> DomainResult<()> {
        self.transactions.write().await.push(transaction);
        Ok(())
    }

    async fn read_all(&self) -> DomainResult<Vec<AnchorTransaction>> {
        Ok(self.transactions.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertEvent, AlertKind};
    use crate::anchor::SubmissionStatus;
    use crate::reading::{DoorState, Reading};
    use chrono::Utc;

    fn failed_transaction(device_id: &str) -> AnchorTransaction {
        let reading = Reading {
            device_id: device_id.to_string(),
            timestamp: Utc::now(),
            temperature_c: 9.5,
            humidity_percent: 70.0,
            battery_voltage: 3.9,
            door_state: DoorState::Closed,
        };
        let event = AlertEvent::from_reading(&reading, AlertKind::HighTemp);
        AnchorTransaction::failed(&event, "fp", "boom")
    }

    #[tokio::test]
    async fn records_in_order() {
        let log = InMemoryAnchorLog::new();
        log.record(failed_transaction("a")).await.unwrap();
        log.record(failed_transaction("b")).await.unwrap();

        let all = log.read_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].device_id, "a");
        assert_eq!(all[1].device_id, "b");
        assert_eq!(all[0].status, SubmissionStatus::Failed);
    }
}
