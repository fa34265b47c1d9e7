use crate::transaction::SignedEnvelope;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Application error code the ledger uses for a stale or reused nonce.
pub const NONCE_CONFLICT_CODE: i64 = -32001;

#[derive(Error, Debug)]
pub enum RpcError {
    /// The endpoint could not be reached or did not answer in time.
    #[error("transport: {0}")]
    Transport(String),

    /// The ledger answered and refused the request.
    #[error("ledger rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// The ledger answered with something that does not parse.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// Nonce conflicts are retryable with a freshly synced nonce. The
    /// ledger signals them with a dedicated code, but older deployments
    /// only put "nonce" in the message, so both are checked.
    pub fn is_nonce_conflict(&self) -> bool {
        match self {
            RpcError::Rejected { code, message } => {
                *code == NONCE_CONFLICT_CODE || message.to_lowercase().contains("nonce")
            }
            _ => false,
        }
    }
}

/// One alert entry as the ledger returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub device_id: String,
    pub alert_type: String,
    pub timestamp: String,
    pub fingerprint: String,
}

/// JSON-RPC surface of the alert ledger.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Confirmed transaction count for an account; doubles as its next
    /// nonce.
    async fn transaction_count(&self, account: &str) -> Result<u64, RpcError>;

    /// Submit a signed envelope. Returns the ledger-assigned transaction id.
    async fn submit_transaction(&self, envelope: &SignedEnvelope) -> Result<String, RpcError>;

    /// Number of alert entries recorded so far.
    async fn alert_count(&self) -> Result<u64, RpcError>;

    /// One alert entry by index (0-based).
    async fn alert_at(&self, index: u64) -> Result<AlertRecord, RpcError>;
}

/// JSON-RPC 2.0 client over HTTP, pinned to one alert contract.
pub struct HttpLedgerRpc {
    client: reqwest::Client,
    url: String,
    contract: String,
    next_id: AtomicU64,
}

impl HttpLedgerRpc {
    pub fn new(
        url: impl Into<String>,
        contract: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            contract: contract.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "ledger rpc call");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Transport(format!("http status {status}")));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(RpcError::Rejected {
                code: error.code,
                message: error.message,
            });
        }
        body.result
            .ok_or_else(|| RpcError::Malformed("neither result nor error in response".to_string()))
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn transaction_count(&self, account: &str) -> Result<u64, RpcError> {
        self.call("ledger_getTransactionCount", serde_json::json!([account]))
            .await
    }

    async fn submit_transaction(&self, envelope: &SignedEnvelope) -> Result<String, RpcError> {
        self.call("ledger_submitTransaction", serde_json::json!([envelope]))
            .await
    }

    async fn alert_count(&self) -> Result<u64, RpcError> {
        self.call("ledger_getAlertCount", serde_json::json!([self.contract]))
            .await
    }

    async fn alert_at(&self, index: u64) -> Result<AlertRecord, RpcError> {
        self.call("ledger_getAlert", serde_json::json!([self.contract, index]))
            .await
    }
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}
