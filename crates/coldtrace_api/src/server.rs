use crate::state::AppState;
use crate::{ledger_handler, summary_handler, telemetry_handler};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Assemble the full route table.
///
/// The dashboard and external tooling are cross-origin clients, hence the
/// permissive CORS layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(summary_handler::health))
        .route("/api/data", post(telemetry_handler::receive_data))
        .route("/api/latest", get(telemetry_handler::latest))
        .route("/api/history", get(telemetry_handler::history))
        .route("/api/devices", get(telemetry_handler::devices))
        .route("/api/ledger/alerts", get(ledger_handler::alerts))
        .route("/api/ledger/reconcile", get(ledger_handler::reconcile))
        .route("/api/ai", post(summary_handler::ask))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until the shutdown token fires, then drain in-flight
/// requests and return.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("http api stopped");
    Ok(())
}
