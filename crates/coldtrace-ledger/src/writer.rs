use crate::nonce::{NonceAllocator, NonceLease};
use crate::rpc::{LedgerRpc, RpcError};
use crate::signer::TransactionSigner;
use crate::transaction::{AlertParams, UnsignedEnvelope, STORE_ALERT_METHOD};
use async_trait::async_trait;
use chrono::Utc;
use coldtrace_domain::alert::AlertEvent;
use coldtrace_domain::anchor::{AnchorKey, AnchorTransaction, SubmissionStatus};
use coldtrace_domain::fingerprint::fingerprint_reading;
use coldtrace_domain::repository::AnchorWriter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Backoff schedule for transient submission failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (0-based backoff counter).
    pub fn delay_for(&self, backoff: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(backoff as i32);
        let secs = (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

enum SubmitError {
    /// Signing or serialization trouble; retrying cannot help.
    Fatal(String),
    Rpc(RpcError),
}

/// Anchors alerts as signed ledger transactions.
///
/// Ordering and idempotency rules this type upholds:
/// - at most one submission in flight; the nonce lease is held across the
///   whole build, sign and submit sequence
/// - an alert already anchored in this process is never submitted again
/// - a failed attempt consumes nothing: the nonce counter is invalidated
///   instead of advanced and no idempotency entry is written, so a later
///   call retries from a freshly synced nonce
pub struct ChainAnchorWriter {
    signer: TransactionSigner,
    rpc: Arc<dyn LedgerRpc>,
    contract: String,
    nonce: NonceAllocator,
    retry: RetryPolicy,
    anchored: Mutex<HashMap<AnchorKey, AnchorTransaction>>,
}

impl ChainAnchorWriter {
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        signer: TransactionSigner,
        contract: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        let nonce = NonceAllocator::new(rpc.clone(), signer.account());
        Self {
            signer,
            rpc,
            contract: contract.into(),
            nonce,
            retry,
            anchored: Mutex::new(HashMap::new()),
        }
    }

    async fn try_submit(
        &self,
        lease: &mut NonceLease<'_>,
        params: &AlertParams,
        event: &AlertEvent,
        fingerprint: &str,
    ) -> Result<AnchorTransaction, SubmitError> {
        let nonce = lease.current().await.map_err(SubmitError::Rpc)?;
        let unsigned = UnsignedEnvelope {
            account: self.signer.account().to_string(),
            nonce,
            contract: self.contract.clone(),
            method: STORE_ALERT_METHOD.to_string(),
            params: params.clone(),
        };
        let signed = self
            .signer
            .sign(&unsigned)
            .map_err(|e| SubmitError::Fatal(e.to_string()))?;
        let tx_id = self
            .rpc
            .submit_transaction(&signed)
            .await
            .map_err(SubmitError::Rpc)?;

        Ok(AnchorTransaction {
            device_id: event.device_id.clone(),
            alert_type: event.kind,
            timestamp: params.timestamp.clone(),
            fingerprint: fingerprint.to_string(),
            nonce: Some(nonce),
            signed_payload: Some(signed.signature),
            status: SubmissionStatus::Pending,
            tx_id: Some(tx_id),
            error: None,
            submitted_at: Utc::now(),
        })
    }

    async fn submit_with_retries(
        &self,
        lease: &mut NonceLease<'_>,
        event: &AlertEvent,
        fingerprint: &str,
    ) -> AnchorTransaction {
        let params = AlertParams::from_event(event, fingerprint);
        let attempts = self.retry.max_attempts.max(1);
        let mut backoffs = 0u32;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.try_submit(lease, &params, event, fingerprint).await {
                Ok(transaction) => {
                    info!(
                        nonce = transaction.nonce,
                        tx_id = transaction.tx_id.as_deref().unwrap_or(""),
                        attempt,
                        "alert submitted"
                    );
                    return transaction;
                }
                Err(SubmitError::Fatal(message)) => {
                    warn!(attempt, "non-retryable submission failure: {message}");
                    return AnchorTransaction::failed(event, fingerprint, message);
                }
                Err(SubmitError::Rpc(err)) => {
                    lease.invalidate();
                    last_error = err.to_string();
                    if attempt == attempts {
                        break;
                    }
                    if err.is_nonce_conflict() {
                        // Another signer moved the account. Re-sync and go
                        // again without waiting.
                        debug!(attempt, "nonce conflict; retrying with a fresh nonce");
                        continue;
                    }
                    warn!(attempt, "submission failed, backing off: {last_error}");
                    tokio::time::sleep(self.retry.delay_for(backoffs)).await;
                    backoffs += 1;
                }
            }
        }

        warn!(attempts, "retry budget exhausted: {last_error}");
        AnchorTransaction::failed(event, fingerprint, last_error)
    }
}

#[async_trait]
impl AnchorWriter for ChainAnchorWriter {
    #[instrument(skip(self, event), fields(device_id = %event.device_id, alert_type = %event.kind))]
    async fn anchor(&self, event: &AlertEvent) -> AnchorTransaction {
        let fingerprint = match fingerprint_reading(&event.source_reading) {
            Ok(fingerprint) => fingerprint,
            Err(err) => return AnchorTransaction::failed(event, "", format!("fingerprint: {err}")),
        };
        let key = AnchorKey::from_event(event, &fingerprint);

        {
            let anchored = self.anchored.lock().await;
            if let Some(prior) = anchored.get(&key) {
                debug!("alert already anchored; returning prior transaction");
                return prior.clone();
            }
        }

        let mut lease = self.nonce.acquire().await;

        // Re-check after taking the lease: a concurrent duplicate may have
        // anchored this alert while we waited.
        {
            let anchored = self.anchored.lock().await;
            if let Some(prior) = anchored.get(&key) {
                debug!("alert anchored while waiting for the nonce lease");
                return prior.clone();
            }
        }

        let transaction = self.submit_with_retries(&mut lease, event, &fingerprint).await;
        if transaction.status != SubmissionStatus::Failed {
            lease.advance();
            self.anchored.lock().await.insert(key, transaction.clone());
        }
        transaction
    }
}

/// Stand-in used when no ledger endpoint or signing key is configured.
///
/// Telemetry keeps flowing; every anchor attempt reports failed with reason
/// `ledger_unconfigured`, so the anchor log shows exactly what went
/// unanchored once a ledger is wired up.
pub struct UnconfiguredAnchorWriter;

#[async_trait]
impl AnchorWriter for UnconfiguredAnchorWriter {
    async fn anchor(&self, event: &AlertEvent) -> AnchorTransaction {
        let fingerprint = fingerprint_reading(&event.source_reading).unwrap_or_default();
        warn!(
            device_id = %event.device_id,
            alert_type = %event.kind,
            "ledger not configured; alert not anchored"
        );
        AnchorTransaction::failed(event, &fingerprint, "ledger_unconfigured")
    }
}
