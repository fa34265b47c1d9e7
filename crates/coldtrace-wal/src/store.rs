use crate::config::WalConfig;
use crate::journal::{self, Journal};
use async_trait::async_trait;
use coldtrace_domain::error::{DomainError, DomainResult};
use coldtrace_domain::reading::Reading;
use coldtrace_domain::repository::ReadingStore;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Write-ahead reading store.
///
/// Appends hit the journal first (write + fsync), then an in-memory replica
/// that serves every read. Startup replays the journal to rebuild the
/// replica, skipping a torn final line left by a crash mid-append; the torn
/// record was never acknowledged, so dropping it is correct.
pub struct WalReadingStore {
    journal: Mutex<Journal>,
    replica: RwLock<Vec<Reading>>,
}

impl WalReadingStore {
    pub async fn open(config: &WalConfig) -> DomainResult<Self> {
        let lines = journal::replay(&config.path).await?;

        let mut replica = Vec::with_capacity(lines.len());
        let mut skipped = 0usize;
        for line in &lines {
            match serde_json::from_str::<Reading>(line) {
                Ok(reading) => replica.push(reading),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, path = %config.path, "skipped undecodable journal lines");
        }

        let journal = Journal::open(&config.path).await?;
        info!(path = %config.path, records = replica.len(), "reading journal replayed");

        Ok(Self {
            journal: Mutex::new(journal),
            replica: RwLock::new(replica),
        })
    }
}

#[async_trait]
impl ReadingStore for WalReadingStore {
    async fn append(&self, reading: Reading) -> DomainResult<u64> {
        let line = serde_json::to_string(&reading)
            .map_err(|e| DomainError::StoreError(format!("unserializable reading: {e}")))?;

        // The journal lock spans write + fsync so concurrent appends
        // serialize and lines never interleave. The replica update happens
        // under the same lock to keep replica order equal to journal order.
        let mut journal = self.journal.lock().await;
        journal.append(&line).await?;
        let mut replica = self.replica.write().await;
        replica.push(reading);
        Ok((replica.len() - 1) as u64)
    }

    async fn read_all(&self) -> DomainResult<Vec<Reading>> {
        Ok(self.replica.read().await.clone())
    }

    async fn latest(&self) -> DomainResult<Option<Reading>> {
        Ok(self.replica.read().await.last().cloned())
    }

    async fn latest_per_device(&self) -> DomainResult<HashMap<String, Reading>> {
        let replica = self.replica.read().await;
        let mut latest = HashMap::new();
        for reading in replica.iter() {
            latest.insert(reading.device_id.clone(), reading.clone());
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coldtrace_domain::reading::DoorState;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    fn reading(device_id: &str, temperature_c: f64) -> Reading {
        Reading {
            device_id: device_id.to_string(),
            timestamp: Utc::now(),
            temperature_c,
            humidity_percent: 70.0,
            battery_voltage: 3.9,
            door_state: DoorState::Closed,
        }
    }

    fn config(dir: &tempfile::TempDir) -> WalConfig {
        WalConfig {
            path: dir
                .path()
                .join("readings.jsonl")
                .to_string_lossy()
                .into_owned(),
        }
    }

    #[tokio::test]
    async fn opens_empty_when_no_journal_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = WalReadingStore::open(&config(&dir)).await.unwrap();

        assert!(store.read_all().await.unwrap().is_empty());
        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn acknowledged_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let store = WalReadingStore::open(&config).await.unwrap();
        store.append(reading("truck-1", 4.0)).await.unwrap();
        store.append(reading("truck-2", 9.5)).await.unwrap();
        drop(store);

        let reopened = WalReadingStore::open(&config).await.unwrap();
        let all = reopened.read_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].device_id, "truck-1");
        assert_eq!(all[1].device_id, "truck-2");
        assert_eq!(
            reopened.latest().await.unwrap().unwrap().device_id,
            "truck-2"
        );
    }

    #[tokio::test]
    async fn record_ids_continue_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let store = WalReadingStore::open(&config).await.unwrap();
        assert_eq!(store.append(reading("a", 1.0)).await.unwrap(), 0);
        drop(store);

        let reopened = WalReadingStore::open(&config).await.unwrap();
        assert_eq!(reopened.append(reading("b", 2.0)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn torn_final_line_is_dropped_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let store = WalReadingStore::open(&config).await.unwrap();
        store.append(reading("truck-1", 4.0)).await.unwrap();
        drop(store);

        // Simulate a crash mid-append: a partial record with no newline.
        let mut contents = tokio::fs::read_to_string(&config.path).await.unwrap();
        contents.push_str("{\"device_id\":\"truck-2\",\"tempe");
        tokio::fs::write(&config.path, contents).await.unwrap();

        let reopened = WalReadingStore::open(&config).await.unwrap();
        let all = reopened.read_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].device_id, "truck-1");

        // The journal keeps accepting appends after a torn tail.
        reopened.append(reading("truck-3", 5.0)).await.unwrap();
        assert_eq!(reopened.read_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_appends_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let store = Arc::new(WalReadingStore::open(&config).await.unwrap());

        let mut tasks = JoinSet::new();
        for task in 0..8 {
            let store = store.clone();
            tasks.spawn(async move {
                for i in 0..8 {
                    let id = format!("truck-{task}");
                    store.append(reading(&id, i as f64)).await.unwrap();
                }
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        assert_eq!(store.read_all().await.unwrap().len(), 64);
        drop(store);

        let reopened = WalReadingStore::open(&config).await.unwrap();
        assert_eq!(reopened.read_all().await.unwrap().len(), 64);
    }

    #[tokio::test]
    async fn latest_per_device_reflects_replayed_history() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let store = WalReadingStore::open(&config).await.unwrap();
        store.append(reading("a", 1.0)).await.unwrap();
        store.append(reading("b", 2.0)).await.unwrap();
        store.append(reading("a", 3.0)).await.unwrap();
        drop(store);

        let reopened = WalReadingStore::open(&config).await.unwrap();
        let latest = reopened.latest_per_device().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["a"].temperature_c, 3.0);
    }
}
