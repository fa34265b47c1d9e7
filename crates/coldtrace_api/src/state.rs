use chrono::Duration;
use coldtrace_domain::ingest_service::TelemetryIngestService;
use coldtrace_domain::reconcile::ReconciliationService;
use coldtrace_domain::repository::{AnchorLog, AnchorWriter, LedgerReader, ReadingStore};
use coldtrace_domain::summary_service::SummaryService;
use std::sync::Arc;

/// Everything the handlers need, assembled once at startup.
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<TelemetryIngestService>,
    pub summary: Arc<SummaryService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub readings: Arc<dyn ReadingStore>,
    pub ledger: Arc<dyn LedgerReader>,
    pub ledger_configured: bool,
}

impl AppState {
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        anchor_writer: Arc<dyn AnchorWriter>,
        anchor_log: Arc<dyn AnchorLog>,
        ledger: Arc<dyn LedgerReader>,
        ledger_configured: bool,
        reconcile_grace: Duration,
    ) -> Self {
        let ingest = Arc::new(TelemetryIngestService::new(
            readings.clone(),
            anchor_writer,
            anchor_log.clone(),
        ));
        let summary = Arc::new(SummaryService::new(readings.clone(), ledger.clone()));
        let reconciliation = Arc::new(ReconciliationService::new(
            anchor_log,
            ledger.clone(),
            reconcile_grace,
        ));
        Self {
            ingest,
            summary,
            reconciliation,
            readings,
            ledger,
            ledger_configured,
        }
    }
}
