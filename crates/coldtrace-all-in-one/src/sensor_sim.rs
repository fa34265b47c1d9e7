use chrono::Utc;
use coldtrace_domain::ingest_service::{ReadingSubmission, TelemetryIngestService};
use coldtrace_domain::reading::{format_timestamp, DoorState};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct SimulatorConfig {
    pub device_id: String,
    pub interval: Duration,
}

/// Feed one synthetic reading per interval into the ingest service until
/// cancelled. The first reading goes out immediately.
pub async fn run_sensor_sim(
    service: Arc<TelemetryIngestService>,
    config: SimulatorConfig,
    token: CancellationToken,
) -> anyhow::Result<()> {
    info!(
        device_id = %config.device_id,
        interval_secs = config.interval.as_secs(),
        "sensor simulator started"
    );
    let mut ticker = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("sensor simulator stopping");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let submission = synthetic_submission(&config.device_id);
        match service.ingest(submission).await {
            Ok(receipt) => info!(
                record_id = receipt.record_id,
                alerts = receipt.alerts.len(),
                "synthetic reading accepted"
            ),
            Err(err) => warn!("synthetic reading rejected: {err}"),
        }
    }
}

fn synthetic_submission(device_id: &str) -> ReadingSubmission {
    let mut rng = rand::thread_rng();
    let door_state = if rng.gen_bool(0.05) {
        DoorState::Open
    } else {
        DoorState::Closed
    };
    ReadingSubmission {
        device_id: device_id.to_string(),
        timestamp: format_timestamp(&Utc::now()),
        temperature_c: round2(rng.gen_range(-5.0..10.0)),
        humidity_percent: round2(rng.gen_range(60.0..95.0)),
        battery_voltage: round2(rng.gen_range(3.3..4.2)),
        door_state,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
