use crate::rpc::{LedgerRpc, RpcError};
use async_trait::async_trait;
use coldtrace_domain::error::{DomainError, DomainResult};
use coldtrace_domain::ledger_entry::LedgerEntry;
use coldtrace_domain::repository::LedgerReader;
use std::sync::Arc;
use tracing::debug;

/// Reads the canonical alert list back off the ledger.
pub struct ChainLedgerReader {
    rpc: Arc<dyn LedgerRpc>,
}

impl ChainLedgerReader {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self { rpc }
    }

    async fn entries_in(&self, start: u64, end: u64) -> DomainResult<Vec<LedgerEntry>> {
        let mut entries = Vec::with_capacity((end - start) as usize);
        for index in start..end {
            entries.push(self.entry_at(index).await?);
        }
        debug!(start, end, "fetched ledger entries");
        Ok(entries)
    }
}

#[async_trait]
impl LedgerReader for ChainLedgerReader {
    async fn count(&self) -> DomainResult<u64> {
        self.rpc.alert_count().await.map_err(unavailable)
    }

    async fn entry_at(&self, index: u64) -> DomainResult<LedgerEntry> {
        let record = self.rpc.alert_at(index).await.map_err(unavailable)?;
        Ok(LedgerEntry {
            index,
            device_id: record.device_id,
            alert_type: record.alert_type,
            timestamp: record.timestamp,
            fingerprint: record.fingerprint,
        })
    }

    async fn recent_entries(&self, n: u64) -> DomainResult<Vec<LedgerEntry>> {
        let count = self.count().await?;
        self.entries_in(count.saturating_sub(n), count).await
    }

    async fn all_entries(&self) -> DomainResult<Vec<LedgerEntry>> {
        let count = self.count().await?;
        self.entries_in(0, count).await
    }
}

// Every read failure means the caller cannot trust the ledger view right
// now, whatever the transport-level detail was.
fn unavailable(err: RpcError) -> DomainError {
    DomainError::LedgerUnavailable(err.to_string())
}

/// Reader used when no ledger endpoint is configured.
pub struct UnconfiguredLedgerReader;

#[async_trait]
impl LedgerReader for UnconfiguredLedgerReader {
    async fn count(&self) -> DomainResult<u64> {
        Err(DomainError::LedgerUnavailable(
            "ledger not configured".to_string(),
        ))
    }

    async fn entry_at(&self, _index: u64) -> DomainResult<LedgerEntry> {
        Err(DomainError::LedgerUnavailable(
            "ledger not configured".to_string(),
        ))
    }

    async fn recent_entries(&self, _n: u64) -> DomainResult<Vec<LedgerEntry>> {
        Err(DomainError::LedgerUnavailable(
            "ledger not configured".to_string(),
        ))
    }

    async fn all_entries(&self) -> DomainResult<Vec<LedgerEntry>> {
        Err(DomainError::LedgerUnavailable(
            "ledger not configured".to_string(),
        ))
    }
}
