use crate::error::DomainResult;
use crate::reading::Reading;
use crate::repository::ReadingStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Volatile reading store for tests and single-process development.
///
/// Durability-sensitive deployments use the write-ahead variant instead;
/// this one loses history on restart.
#[derive(Clone, Default)]
pub struct InMemoryReadingStore {
    readings: Arc<RwLock<Vec<Reading>>>,
}

impl InMemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn append(&self, reading: Reading) -> DomainResult<u64> {
        let mut readings = self.readings.write().await;
        readings.push(reading);
        Ok((readings.len() - 1) as u64)
    }

    async fn read_all(&self) -> DomainResult<Vec<Reading>> {
        Ok(self.readings.read().await.clone())
    }

    async fn latest(&self) -> DomainResult<Option<Reading>> {
        Ok(self.readings.read().await.last().cloned())
    }

    async fn latest_per_device(&self) -> DomainResult<HashMap<String, Reading>> {
        let readings = self.readings.read().await;
        let mut latest = HashMap::new();
        for reading in readings.iter() {
            latest.insert(reading.device_id.clone(), reading.clone());
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::DoorState;
    use chrono::Utc;

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

    #[tokio::test]
    async fn append_returns_sequential_record_ids() {
        let store = InMemoryReadingStore::new();
        assert_eq!(store.append(reading("a", 1.0)).await.unwrap(), 0);
        assert_eq!(store.append(reading("a", 2.0)).await.unwrap(), 1);
        assert_eq!(store.append(reading("b", 3.0)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn read_all_preserves_insertion_order() {
        let store = InMemoryReadingStore::new();
        store.append(reading("a", 1.0)).await.unwrap();
        store.append(reading("b", 2.0)).await.unwrap();

        let all = store.read_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].device_id, "a");
        assert_eq!(all[1].device_id, "b");
    }

    #[tokio::test]
    async fn latest_is_none_when_empty() {
        let store = InMemoryReadingStore::new();
        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_per_device_keeps_the_newest_reading() {
        let store = InMemoryReadingStore::new();
        store.append(reading("a", 1.0)).await.unwrap();
        store.append(reading("b", 2.0)).await.unwrap();
        store.append(reading("a", 3.0)).await.unwrap();

        let latest = store.latest_per_device().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["a"].temperature_c, 3.0);
        assert_eq!(latest["b"].temperature_c, 2.0);
    }
}
