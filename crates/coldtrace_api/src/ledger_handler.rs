use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use coldtrace_domain::ledger_entry::LedgerEntry;
use coldtrace_domain::reconcile::ReconciliationReport;

/// GET /api/ledger/alerts
pub async fn alerts(State(state): State<AppState>) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    Ok(Json(state.ledger.all_entries().await?))
}

/// GET /api/ledger/reconcile
pub async fn reconcile(
    State(state): State<AppState>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    Ok(Json(state.reconciliation.reconcile().await?))
}
