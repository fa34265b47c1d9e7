use crate::writer::RetryPolicy;
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ledger connectivity and retry settings.
///
/// `rpc_url`, `contract_address` and `private_key` must all be set for
/// anchoring to run; with any of them absent the service starts with
/// anchoring disabled and reports every alert as failed with reason
/// `ledger_unconfigured`. Reading the ledger needs only `rpc_url` and
/// `contract_address`.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct LedgerConfig {
    #[garde(skip)]
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Address of the alert-recording contract on the ledger.
    #[garde(skip)]
    #[serde(default)]
    pub contract_address: Option<String>,

    /// Expected signing account. The account actually used is always derived
    /// from the private key; this field only cross-checks operator intent.
    #[garde(skip)]
    #[serde(default)]
    pub account_address: Option<String>,

    /// Hex-encoded secp256k1 signing key. Redacted from Debug output and
    /// never serialized back out.
    #[garde(skip)]
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,

    #[garde(range(min = 1))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[garde(skip)]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[garde(skip)]
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[garde(range(min = 1.0))]
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[garde(skip)]
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract_address: None,
            account_address: None,
            private_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl LedgerConfig {
    /// Everything needed to sign and submit anchor transactions.
    pub fn is_configured(&self) -> bool {
        self.is_read_configured() && present(&self.private_key)
    }

    /// Everything needed to query the ledger's alert list.
    pub fn is_read_configured(&self) -> bool {
        present(&self.rpc_url) && present(&self.contract_address)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries + 1,
            initial_delay: Duration::from_millis(self.retry_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("account_address", &self.account_address)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_retry_delay_ms", &self.max_retry_delay_ms)
            .finish()
    }
}
