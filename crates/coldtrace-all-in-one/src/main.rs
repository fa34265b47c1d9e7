mod config;
mod sensor_sim;
mod telemetry;

use crate::config::ServiceConfig;
use crate::sensor_sim::{run_sensor_sim, SimulatorConfig};
use coldtrace_api::AppState;
use coldtrace_domain::in_memory_anchor_log::InMemoryAnchorLog;
use coldtrace_domain::repository::{AnchorWriter, LedgerReader, ReadingStore};
use coldtrace_domain::validate::validate_struct;
use coldtrace_ledger::{
    ChainAnchorWriter, ChainLedgerReader, HttpLedgerRpc, LedgerConfig, TransactionSigner,
    UnconfiguredAnchorWriter, UnconfiguredLedgerReader,
};
use coldtrace_runner::Runner;
use coldtrace_wal::{WalConfig, WalReadingStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    telemetry::init_telemetry(&config.log_level);

    let wal_config = build_wal_config(&config);
    let ledger_config = build_ledger_config(&config);
    if let Err(e) = validate_struct(&wal_config).and_then(|()| validate_struct(&ledger_config)) {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!(
        http_host = %config.http_host,
        http_port = config.http_port,
        ledger_configured = ledger_config.is_configured(),
        simulator_enabled = config.simulator_enabled,
        assistant_configured = config.assistant_api_key.is_some(),
        "Starting coldtrace all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    let addr: SocketAddr = match format!("{}:{}", config.http_host, config.http_port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid HTTP listen address: {}", e);
            std::process::exit(1);
        }
    };

    // Open the durable history store; replays any existing journal
    let readings: Arc<dyn ReadingStore> = match WalReadingStore::open(&wal_config).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open reading journal: {}", e);
            std::process::exit(1);
        }
    };

    let (anchor_writer, ledger_reader) = match build_ledger(&ledger_config) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to initialize ledger client: {}", e);
            std::process::exit(1);
        }
    };

    let anchor_log = Arc::new(InMemoryAnchorLog::default());
    let state = AppState::new(
        readings,
        anchor_writer,
        anchor_log,
        ledger_reader,
        ledger_config.is_configured(),
        chrono::Duration::seconds(config.reconcile_grace_secs as i64),
    );

    // Build runner with all processes
    let mut runner = Runner::new().with_process({
        let state = state.clone();
        move |token| coldtrace_api::serve(addr, state, token)
    });

    if config.simulator_enabled {
        let service = state.ingest.clone();
        let sim_config = SimulatorConfig {
            device_id: config.simulator_device_id.clone(),
            interval: Duration::from_secs(config.simulator_interval_secs),
        };
        runner = runner.with_process(move |token| run_sensor_sim(service, sim_config, token));
    }

    if let Err(e) = runner.run().await {
        error!("Service stopped with error: {:#}", e);
        std::process::exit(1);
    }
}

fn build_wal_config(config: &ServiceConfig) -> WalConfig {
    WalConfig {
        path: config.wal_path.clone(),
    }
}

fn build_ledger_config(config: &ServiceConfig) -> LedgerConfig {
    LedgerConfig {
        rpc_url: config.ledger_rpc_url.clone(),
        contract_address: config.ledger_contract_address.clone(),
        account_address: config.ledger_account_address.clone(),
        private_key: config.ledger_private_key.clone(),
        request_timeout_secs: config.ledger_request_timeout_secs,
        max_retries: config.ledger_max_retries,
        retry_delay_ms: config.ledger_retry_delay_ms,
        backoff_multiplier: config.ledger_backoff_multiplier,
        max_retry_delay_ms: config.ledger_max_retry_delay_ms,
    }
}

/// Pick ledger implementations for what the configuration allows: full
/// chain clients, read-only, or the unconfigured stand-ins.
fn build_ledger(
    config: &LedgerConfig,
) -> anyhow::Result<(Arc<dyn AnchorWriter>, Arc<dyn LedgerReader>)> {
    if !config.is_read_configured() {
        info!("Ledger not configured; anchoring and ledger reads disabled");
        return Ok((
            Arc::new(UnconfiguredAnchorWriter),
            Arc::new(UnconfiguredLedgerReader),
        ));
    }

    let rpc_url = config.rpc_url.clone().unwrap_or_default();
    let contract = config.contract_address.clone().unwrap_or_default();
    let rpc = Arc::new(HttpLedgerRpc::new(
        rpc_url,
        contract.clone(),
        config.request_timeout(),
    )?);
    let reader: Arc<dyn LedgerReader> = Arc::new(ChainLedgerReader::new(rpc.clone()));

    if !config.is_configured() {
        info!("No signing key; ledger reads enabled, anchoring disabled");
        return Ok((Arc::new(UnconfiguredAnchorWriter), reader));
    }

    let key = config.private_key.clone().unwrap_or_default();
    let signer = TransactionSigner::from_hex_key(&key)?;
    if let Some(expected) = config.account_address.as_deref() {
        if !expected.is_empty() && !expected.eq_ignore_ascii_case(signer.account()) {
            warn!(
                configured = expected,
                derived = signer.account(),
                "Configured account does not match the signing key; using the derived account"
            );
        }
    }
    let writer: Arc<dyn AnchorWriter> = Arc::new(ChainAnchorWriter::new(
        rpc,
        signer,
        contract,
        config.retry_policy(),
    ));
    Ok((writer, reader))
}
