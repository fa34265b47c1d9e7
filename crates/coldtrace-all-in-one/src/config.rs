use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // HTTP configuration
    /// HTTP listen host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP listen port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // History store configuration
    /// Path of the reading journal file
    #[serde(default = "default_wal_path")]
    pub wal_path: String,

    // Ledger configuration
    /// Ledger JSON-RPC endpoint URL
    #[serde(default)]
    pub ledger_rpc_url: Option<String>,

    /// Address of the alert-recording contract
    #[serde(default)]
    pub ledger_contract_address: Option<String>,

    /// Expected signing account (cross-checked against the key at startup)
    #[serde(default)]
    pub ledger_account_address: Option<String>,

    /// Hex-encoded signing private key (secret, redacted from Debug output)
    #[serde(default, skip_serializing)]
    pub ledger_private_key: Option<String>,

    /// Per-request ledger RPC timeout in seconds
    #[serde(default = "default_ledger_request_timeout_secs")]
    pub ledger_request_timeout_secs: u64,

    /// Retries after the first failed submission attempt
    #[serde(default = "default_ledger_max_retries")]
    pub ledger_max_retries: u32,

    /// Initial retry backoff in milliseconds
    #[serde(default = "default_ledger_retry_delay_ms")]
    pub ledger_retry_delay_ms: u64,

    /// Backoff growth factor between retries
    #[serde(default = "default_ledger_backoff_multiplier")]
    pub ledger_backoff_multiplier: f64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_ledger_max_retry_delay_ms")]
    pub ledger_max_retry_delay_ms: u64,

    // Reconciliation configuration
    /// Age before an unconfirmed local transaction counts as missing, in
    /// seconds
    #[serde(default = "default_reconcile_grace_secs")]
    pub reconcile_grace_secs: u64,

    // Sensor simulator configuration
    /// Run the synthetic sensor in-process
    #[serde(default = "default_simulator_enabled")]
    pub simulator_enabled: bool,

    /// Device id the simulator reports under
    #[serde(default = "default_simulator_device_id")]
    pub simulator_device_id: String,

    /// Seconds between synthetic readings
    #[serde(default = "default_simulator_interval_secs")]
    pub simulator_interval_secs: u64,

    // Assistant configuration
    /// Credential for a generative summarization backend. Accepted for
    /// forward compatibility; the built-in summarizer is rule-based and
    /// never sends it anywhere.
    #[serde(default, skip_serializing)]
    pub assistant_api_key: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

// HTTP defaults
fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5000
}

// History store defaults
fn default_wal_path() -> String {
    "data/readings.jsonl".to_string()
}

// Ledger defaults
fn default_ledger_request_timeout_secs() -> u64 {
    5
}

fn default_ledger_max_retries() -> u32 {
    3
}

fn default_ledger_retry_delay_ms() -> u64 {
    1000
}

fn default_ledger_backoff_multiplier() -> f64 {
    2.0
}

fn default_ledger_max_retry_delay_ms() -> u64 {
    30_000
}

// Reconciliation defaults
fn default_reconcile_grace_secs() -> u64 {
    120
}

// Simulator defaults
fn default_simulator_enabled() -> bool {
    false
}

fn default_simulator_device_id() -> String {
    "simulated_coldchain_01".to_string()
}

fn default_simulator_interval_secs() -> u64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("COLDTRACE"))
            .build()?
            .try_deserialize()
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("log_level", &self.log_level)
            .field("http_host", &self.http_host)
            .field("http_port", &self.http_port)
            .field("wal_path", &self.wal_path)
            .field("ledger_rpc_url", &self.ledger_rpc_url)
            .field("ledger_contract_address", &self.ledger_contract_address)
            .field("ledger_account_address", &self.ledger_account_address)
            .field(
                "ledger_private_key",
                &self.ledger_private_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "ledger_request_timeout_secs",
                &self.ledger_request_timeout_secs,
            )
            .field("ledger_max_retries", &self.ledger_max_retries)
            .field("ledger_retry_delay_ms", &self.ledger_retry_delay_ms)
            .field("ledger_backoff_multiplier", &self.ledger_backoff_multiplier)
            .field("ledger_max_retry_delay_ms", &self.ledger_max_retry_delay_ms)
            .field("reconcile_grace_secs", &self.reconcile_grace_secs)
            .field("simulator_enabled", &self.simulator_enabled)
            .field("simulator_device_id", &self.simulator_device_id)
            .field("simulator_interval_secs", &self.simulator_interval_secs)
            .field(
                "assistant_api_key",
                &self.assistant_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
