// libs/automation-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fixed slot shape used by automated generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationDefaults {
    pub slot_duration_minutes: u16,
    pub max_bookings: u32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 60,
            max_bookings: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationOutcomeKind {
    Generated,
    Skipped,
    Errored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub date: NaiveDate,
    pub kind: GenerationOutcomeKind,
    pub detail: String,
}

/// Aggregated result of one generation run. Per-date failures never abort
/// the run; they are counted here instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generated: u32,
    pub skipped: u32,
    pub errored: u32,
    pub outcomes: Vec<GenerationOutcome>,
}

impl GenerationSummary {
    pub fn record(&mut self, date: NaiveDate, kind: GenerationOutcomeKind, detail: impl Into<String>) {
        match kind {
            GenerationOutcomeKind::Generated => self.generated += 1,
            GenerationOutcomeKind::Skipped => self.skipped += 1,
            GenerationOutcomeKind::Errored => self.errored += 1,
        }
        self.outcomes.push(GenerationOutcome {
            date,
            kind,
            detail: detail.into(),
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateGenerationStatus {
    pub date: NaiveDate,
    pub slot_set_exists: bool,
    pub is_working_day: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkGenerateRequest {
    pub from: NaiveDate,
    pub days: u32,
    pub slot_duration_minutes: Option<u16>,
    pub max_bookings: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Dry-run view over the upcoming generation window; never writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSummary {
    pub from: NaiveDate,
    pub days: u32,
    pub already_generated: u32,
    pub pending_working_days: u32,
    pub non_working_days: u32,
}
