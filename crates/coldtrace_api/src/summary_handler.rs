use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use coldtrace_domain::ledger_entry::LedgerEntry;
use coldtrace_domain::reading::format_timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub status: &'static str,
    pub answer: String,
    pub history_count: usize,
    pub ledger_alert_count: usize,
    pub ledger_alerts: Vec<LedgerEntry>,
}

/// POST /api/ai
pub async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let summary = state.summary.summarize(&request.question).await?;
    Ok(Json(SummaryResponse {
        status: "ok",
        answer: summary.answer,
        history_count: summary.history_count,
        ledger_alert_count: summary.ledger_alert_count,
        ledger_alerts: summary.ledger_alerts,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: String,
    pub ledger_configured: bool,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        time: format_timestamp(&Utc::now()),
        ledger_configured: state.ledger_configured,
    })
}
