// libs/automation-cell/src/services/generation.rs
use chrono::{Duration, Local, NaiveDate};
use tracing::{debug, info, warn};

use scheduling_cell::error::ScheduleError;
use scheduling_cell::services::calendar::{weekday_index, WorkingDayCalendarService};
use scheduling_cell::services::generator::generate_slots;
use scheduling_cell::services::slots::DailySlotStoreService;
use shared_config::AppConfig;

use crate::models::{
    DateGenerationStatus, GenerationDefaults, GenerationOutcomeKind, GenerationSummary,
    WindowSummary,
};

pub const DAILY_GENERATION_DAYS: u32 = 30;
pub const WEEKLY_HORIZON_DAYS: i64 = 90;

pub const SYSTEM_ACTOR: &str = "system";

enum DateOutcome {
    Created(usize),
    AlreadyExists,
    NonWorking,
}

/// Idempotent pre-generation of daily slot sets over a date range. Safe to
/// re-run at any time: existing dates and non-working days are skipped, and
/// a racing run losing the create counts as a skip, not a failure.
pub struct SlotAutomationService {
    calendar: WorkingDayCalendarService,
    slots: DailySlotStoreService,
}

impl SlotAutomationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            calendar: WorkingDayCalendarService::new(config),
            slots: DailySlotStoreService::new(config),
        }
    }

    /// Daily trigger: make sure the next 30 days are materialized.
    pub async fn run_daily(&self, auth_token: Option<&str>) -> GenerationSummary {
        let today = Local::now().date_naive();
        info!("Daily slot generation starting from {}", today);

        let summary = self
            .ensure_range(today, DAILY_GENERATION_DAYS, GenerationDefaults::default(), auth_token)
            .await;

        info!(
            "Daily slot generation finished: {} generated, {} skipped, {} errored",
            summary.generated, summary.skipped, summary.errored
        );
        summary
    }

    /// Weekly trigger. A 90-day horizon is computed and logged but the run
    /// still delegates to the 30-day daily routine; the wider window is
    /// currently unused. Do not quietly widen it without product sign-off.
    pub async fn run_weekly(&self, auth_token: Option<&str>) -> GenerationSummary {
        let today = Local::now().date_naive();
        let horizon = today + Duration::days(WEEKLY_HORIZON_DAYS);
        warn!(
            "Weekly slot generation computed horizon {} but delegates to the {}-day daily routine",
            horizon, DAILY_GENERATION_DAYS
        );

        self.run_daily(auth_token).await
    }

    /// Core loop: one independent creation attempt per date, failures
    /// aggregated rather than propagated.
    pub async fn ensure_range(
        &self,
        from: NaiveDate,
        days: u32,
        defaults: GenerationDefaults,
        auth_token: Option<&str>,
    ) -> GenerationSummary {
        let mut summary = GenerationSummary::default();

        for offset in 0..days {
            let date = from + Duration::days(offset as i64);

            match self.ensure_date(date, defaults, auth_token).await {
                Ok(DateOutcome::Created(count)) => {
                    debug!("Generated {} slots for {}", count, date);
                    summary.record(
                        date,
                        GenerationOutcomeKind::Generated,
                        format!("{} slots generated", count),
                    );
                }
                Ok(DateOutcome::AlreadyExists) => {
                    summary.record(date, GenerationOutcomeKind::Skipped, "slot set already exists");
                }
                Ok(DateOutcome::NonWorking) => {
                    summary.record(date, GenerationOutcomeKind::Skipped, "non-working day");
                }
                Err(e) => {
                    warn!("Slot generation failed for {}: {}", date, e);
                    summary.record(date, GenerationOutcomeKind::Errored, e.to_string());
                }
            }
        }

        summary
    }

    /// Manual single-date trigger.
    pub async fn generate_for_date(
        &self,
        date: NaiveDate,
        defaults: GenerationDefaults,
        auth_token: Option<&str>,
    ) -> GenerationSummary {
        self.ensure_range(date, 1, defaults, auth_token).await
    }

    pub async fn generation_status(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<DateGenerationStatus>, ScheduleError> {
        if to < from {
            return Err(ScheduleError::Validation(
                "Range end must not precede range start".to_string(),
            ));
        }

        let working_days = self.calendar.get_all(auth_token).await?;
        let sets = self.slots.get_for_range(from, to, auth_token).await?;

        let mut statuses = Vec::new();
        let mut date = from;
        while date <= to {
            let is_working = working_days
                .iter()
                .find(|d| d.day_of_week == weekday_index(date))
                .map(|d| d.is_working)
                .unwrap_or(false);

            statuses.push(DateGenerationStatus {
                date,
                slot_set_exists: sets.iter().any(|s| s.date == date),
                is_working_day: is_working,
            });

            date += Duration::days(1);
        }

        Ok(statuses)
    }

    /// Dry run over the standard daily window; reports what a run would do
    /// without touching the store's slot sets.
    pub async fn generation_summary(
        &self,
        auth_token: Option<&str>,
    ) -> Result<WindowSummary, ScheduleError> {
        let from = Local::now().date_naive();
        let to = from + Duration::days(DAILY_GENERATION_DAYS as i64 - 1);

        let statuses = self.generation_status(from, to, auth_token).await?;

        let mut window = WindowSummary {
            from,
            days: DAILY_GENERATION_DAYS,
            already_generated: 0,
            pending_working_days: 0,
            non_working_days: 0,
        };

        for status in statuses {
            if status.slot_set_exists {
                window.already_generated += 1;
            } else if status.is_working_day {
                window.pending_working_days += 1;
            } else {
                window.non_working_days += 1;
            }
        }

        Ok(window)
    }

    async fn ensure_date(
        &self,
        date: NaiveDate,
        defaults: GenerationDefaults,
        auth_token: Option<&str>,
    ) -> Result<DateOutcome, ScheduleError> {
        if self.slots.fetch_for_date(date, auth_token).await?.is_some() {
            return Ok(DateOutcome::AlreadyExists);
        }

        let entry = match self.calendar.get_day(weekday_index(date), auth_token).await? {
            Some(entry) if entry.is_working => entry,
            _ => return Ok(DateOutcome::NonWorking),
        };

        let slots = generate_slots(&entry, defaults.slot_duration_minutes, defaults.max_bookings)?;
        let count = slots.len();

        match self
            .slots
            .create_for_date(date, slots, SYSTEM_ACTOR, auth_token)
            .await
        {
            Ok(_) => Ok(DateOutcome::Created(count)),
            // A concurrent run won the insert; its slot set is as good as ours.
            Err(ScheduleError::DuplicateDate(_)) => Ok(DateOutcome::AlreadyExists),
            Err(e) => Err(e),
        }
    }
}
