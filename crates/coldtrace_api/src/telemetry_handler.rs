use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use coldtrace_domain::ingest_service::{AnchoredAlert, ReadingSubmission};
use coldtrace_domain::reading::Reading;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub record_id: u64,
    pub alerts: Vec<AnchoredAlert>,
}

/// POST /api/data
///
/// The extractor result is taken by hand so malformed JSON comes back as
/// the same `{status, message}` error body every other failure uses.
pub async fn receive_data(
    State(state): State<AppState>,
    payload: Result<Json<ReadingSubmission>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(submission) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let receipt = state.ingest.ingest(submission).await?;
    Ok(Json(IngestResponse {
        status: "ok",
        message: "data received",
        record_id: receipt.record_id,
        alerts: receipt.alerts,
    }))
}

/// GET /api/latest
///
/// An empty history answers `{}` rather than 404 so pollers can treat
/// "nothing yet" as a normal state.
pub async fn latest(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.readings.latest().await? {
        Some(reading) => Ok(Json(
            serde_json::to_value(reading).map_err(|e| ApiError::internal(e.to_string()))?,
        )),
        None => Ok(Json(json!({}))),
    }
}

/// GET /api/history
pub async fn history(State(state): State<AppState>) -> Result<Json<Vec<Reading>>, ApiError> {
    Ok(Json(state.readings.read_all().await?))
}

#[derive(Debug, Serialize)]
pub struct DeviceLatest {
    pub device_id: String,
    pub latest: Reading,
}

/// GET /api/devices
pub async fn devices(State(state): State<AppState>) -> Result<Json<Vec<DeviceLatest>>, ApiError> {
    let mut devices: Vec<DeviceLatest> = state
        .readings
        .latest_per_device()
        .await?
        .into_iter()
        .map(|(device_id, latest)| DeviceLatest { device_id, latest })
        .collect();
    devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
    Ok(Json(devices))
}
