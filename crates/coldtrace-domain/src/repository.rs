use crate::alert::AlertEvent;
use crate::anchor::AnchorTransaction;
use crate::error::DomainResult;
use crate::ledger_entry::LedgerEntry;
use crate::reading::Reading;
use async_trait::async_trait;
use std::collections::HashMap;

/// Durable, append-only log of every accepted reading.
///
/// Implementations should:
/// - preserve insertion order
/// - make a record durable before returning from `append`
/// - tolerate concurrent appenders
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Append one reading and return its record id (insertion index).
    async fn append(&self, reading: Reading) -> DomainResult<u64>;

    /// Every reading, oldest first.
    async fn read_all(&self) -> DomainResult<Vec<Reading>>;

    /// The most recently appended reading, if any.
    async fn latest(&self) -> DomainResult<Option<Reading>>;

    /// Last-seen reading per device.
    ///
    /// Computed by an in-order scan; linear in history size.
    async fn latest_per_device(&self) -> DomainResult<HashMap<String, Reading>>;
}

/// Anchors one alert as one ledger transaction; owns signing, nonce
/// sequencing, retry and idempotency.
///
/// Anchoring never fails its caller. Configuration and submission problems
/// come back inside the returned record so telemetry acceptance is
/// independent of ledger health.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AnchorWriter: Send + Sync {
    async fn anchor(&self, event: &AlertEvent) -> AnchorTransaction;
}

/// Read side of the ledger: the canonical alert list.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Number of alert entries the ledger holds.
    async fn count(&self) -> DomainResult<u64>;

    /// One entry by ledger index.
    async fn entry_at(&self, index: u64) -> DomainResult<LedgerEntry>;

    /// The last `n` entries, ascending by index.
    async fn recent_entries(&self, n: u64) -> DomainResult<Vec<LedgerEntry>>;

    /// Every entry, ascending by index.
    async fn all_entries(&self) -> DomainResult<Vec<LedgerEntry>>;
}

/// Log of completed anchor attempts, consulted by reconciliation.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AnchorLog: Send + Sync {
    async fn record(&self, transaction: AnchorTransaction) -> DomainResult<()>;

    /// Every recorded attempt, oldest first.
    async fn read_all(&self) -> DomainResult<Vec<AnchorTransaction>>;
}
