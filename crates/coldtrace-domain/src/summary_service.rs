use crate::alert::HIGH_TEMP_THRESHOLD_C;
use crate::error::{DomainError, DomainResult};
use crate::ledger_entry::LedgerEntry;
use crate::repository::{LedgerReader, ReadingStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// How many of the newest readings feed the summary context.
const HISTORY_WINDOW: usize = 50;
/// How many of the newest ledger entries feed the summary context.
const LEDGER_WINDOW: u64 = 20;

/// Rule-based answer over recent fleet state.
#[derive(Debug, Clone, Serialize)]
pub struct FleetSummary {
    pub answer: String,
    pub history_count: usize,
    pub ledger_alert_count: usize,
    pub ledger_alerts: Vec<LedgerEntry>,
}

/// Operator Q&A over the newest readings and ledger alerts.
///
/// Answers are keyword rules, nothing more. A generative backend was
/// planned and never wired up; configuring a credential for one changes
/// nothing here.
pub struct SummaryService {
    reading_store: Arc<dyn ReadingStore>,
    ledger_reader: Arc<dyn LedgerReader>,
}

impl SummaryService {
    pub fn new(reading_store: Arc<dyn ReadingStore>, ledger_reader: Arc<dyn LedgerReader>) -> Self {
        Self {
            reading_store,
            ledger_reader,
        }
    }

    #[instrument(skip(self, question))]
    pub async fn summarize(&self, question: &str) -> DomainResult<FleetSummary> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::ValidationError(
                "no question provided".to_string(),
            ));
        }

        let readings = self.reading_store.read_all().await?;
        let start = readings.len().saturating_sub(HISTORY_WINDOW);
        let recent = &readings[start..];

        // Ledger trouble degrades to an empty on-chain context rather than
        // failing the whole summary.
        let ledger_alerts = match self.ledger_reader.recent_entries(LEDGER_WINDOW).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("ledger context unavailable for summary: {err}");
                Vec::new()
            }
        };

        let lowered = question.to_lowercase();
        let mut answer = String::from("I examined the recent data. ");
        if lowered.contains("temperature") || lowered.contains("above") {
            let warm = recent
                .iter()
                .filter(|r| r.temperature_c > HIGH_TEMP_THRESHOLD_C)
                .count();
            if warm > 0 {
                answer.push_str(&format!(
                    "Yes, there are {warm} recent readings above {HIGH_TEMP_THRESHOLD_C}\u{b0}C. "
                ));
            } else {
                answer.push_str(&format!(
                    "No recent readings above {HIGH_TEMP_THRESHOLD_C}\u{b0}C. "
                ));
            }
        } else {
            answer.push_str(
                "I can summarize recent readings, list anchored alerts, or report reconciliation \
                 status.",
            );
        }

        debug!(
            history_count = recent.len(),
            ledger_alert_count = ledger_alerts.len(),
            "summary built"
        );

        Ok(FleetSummary {
            answer,
            history_count: recent.len(),
            ledger_alert_count: ledger_alerts.len(),
            ledger_alerts,
        })
    }
}
