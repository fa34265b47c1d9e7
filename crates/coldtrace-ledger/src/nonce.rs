use crate::rpc::{LedgerRpc, RpcError};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Serializes nonce use for the signing account.
///
/// The ledger rejects gaps and reuse, so only one submission may be in
/// flight at a time. `acquire` hands back a lease that holds the lock for
/// the whole build-sign-submit sequence; nonce order therefore matches
/// submission order.
pub struct NonceAllocator {
    rpc: Arc<dyn LedgerRpc>,
    account: String,
    // Next nonce to hand out. None means cold or invalidated; the next
    // lease re-syncs from the ledger.
    state: Mutex<Option<u64>>,
}

impl NonceAllocator {
    pub fn new(rpc: Arc<dyn LedgerRpc>, account: impl Into<String>) -> Self {
        Self {
            rpc,
            account: account.into(),
            state: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) -> NonceLease<'_> {
        NonceLease {
            rpc: &self.rpc,
            account: &self.account,
            state: self.state.lock().await,
        }
    }
}

/// Exclusive hold on the allocator for one submission attempt sequence.
pub struct NonceLease<'a> {
    rpc: &'a Arc<dyn LedgerRpc>,
    account: &'a str,
    state: MutexGuard<'a, Option<u64>>,
}

impl NonceLease<'_> {
    /// The nonce to use for this attempt, syncing from the ledger when the
    /// local counter is cold or was invalidated.
    pub async fn current(&mut self) -> Result<u64, RpcError> {
        if let Some(nonce) = *self.state {
            return Ok(nonce);
        }
        let nonce = self.rpc.transaction_count(self.account).await?;
        debug!(account = %self.account, nonce, "nonce synced from ledger");
        *self.state = Some(nonce);
        Ok(nonce)
    }

    /// Advance past a successfully submitted nonce.
    pub fn advance(&mut self) {
        if let Some(nonce) = self.state.as_mut() {
            *nonce += 1;
        }
    }

    /// Forget the local counter. A failed or rejected submission leaves the
    /// true account state uncertain; the next attempt must re-sync.
    pub fn invalidate(&mut self) {
        *self.state = None;
    }
}
