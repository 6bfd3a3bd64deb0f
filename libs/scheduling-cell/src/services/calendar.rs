// libs/scheduling-cell/src/services/calendar.rs
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::error::ScheduleError;
use crate::models::{BulkWorkingDayUpdate, UpsertWorkingDayRequest, WorkingDayEntry};

/// Sunday = 0, matching the stored `day_of_week` key.
pub fn weekday_index(date: NaiveDate) -> u8 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

pub struct WorkingDayCalendarService {
    store: StoreClient,
}

impl WorkingDayCalendarService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// All seven weekday templates, synthesizing non-working placeholders for
    /// days that have never been configured.
    pub async fn get_all(&self, auth_token: Option<&str>) -> Result<Vec<WorkingDayEntry>, ScheduleError> {
        let stored = self.fetch_all(auth_token).await?;

        let mut entries = Vec::with_capacity(7);
        for day in 0u8..7 {
            match stored.iter().find(|e| e.day_of_week == day) {
                Some(entry) => entries.push(entry.clone()),
                None => entries.push(WorkingDayEntry::default_for(day)),
            }
        }

        Ok(entries)
    }

    pub async fn get_day(
        &self,
        day_of_week: u8,
        auth_token: Option<&str>,
    ) -> Result<Option<WorkingDayEntry>, ScheduleError> {
        if day_of_week > 6 {
            return Err(ScheduleError::Validation(
                "day_of_week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        let path = format!("/rest/v1/working_days?day_of_week=eq.{}", day_of_week);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;

        match result.into_iter().next() {
            Some(row) => {
                let entry = serde_json::from_value(row)
                    .map_err(|e| ScheduleError::Database(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Whether the business operates on the given calendar date, derived from
    /// the weekday template. Unconfigured weekdays count as non-working.
    pub async fn is_working_date(
        &self,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<bool, ScheduleError> {
        let entry = self.get_day(weekday_index(date), auth_token).await?;
        Ok(entry.map(|e| e.is_working).unwrap_or(false))
    }

    pub async fn upsert(
        &self,
        day_of_week: u8,
        request: UpsertWorkingDayRequest,
        auth_token: Option<&str>,
    ) -> Result<WorkingDayEntry, ScheduleError> {
        if day_of_week > 6 {
            return Err(ScheduleError::Validation(
                "day_of_week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        request.validate()?;

        debug!("Upserting working day {}", day_of_week);

        let existing = self.get_day(day_of_week, auth_token).await?;

        let rows = match existing {
            Some(entry) => {
                let filter = format!("id=eq.{}", entry.id);
                self.store
                    .update_where(
                        "working_days",
                        &filter,
                        auth_token,
                        json!({
                            "is_working": request.is_working,
                            "start_time": request.start_time,
                            "end_time": request.end_time,
                            "break_start": request.break_start,
                            "break_end": request.break_end,
                            "updated_at": Utc::now().to_rfc3339(),
                        }),
                    )
                    .await?
            }
            None => {
                self.store
                    .insert_returning(
                        "working_days",
                        auth_token,
                        json!({
                            "id": uuid::Uuid::new_v4(),
                            "day_of_week": day_of_week,
                            "is_working": request.is_working,
                            "start_time": request.start_time,
                            "end_time": request.end_time,
                            "break_start": request.break_start,
                            "break_end": request.break_end,
                            "created_at": Utc::now().to_rfc3339(),
                            "updated_at": Utc::now().to_rfc3339(),
                        }),
                    )
                    .await?
            }
        };

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Database("Working day write returned no row".to_string()))?;

        serde_json::from_value(row).map_err(|e| ScheduleError::Database(e.to_string()))
    }

    /// Apply several weekday templates in one call. Each entry validates
    /// independently; the first failure aborts the remainder.
    pub async fn bulk_update(
        &self,
        updates: Vec<BulkWorkingDayUpdate>,
        auth_token: Option<&str>,
    ) -> Result<Vec<WorkingDayEntry>, ScheduleError> {
        let mut results = Vec::with_capacity(updates.len());
        for update in updates {
            let entry = self
                .upsert(update.day_of_week, update.entry, auth_token)
                .await?;
            results.push(entry);
        }
        Ok(results)
    }

    /// Soft delete: flip `is_working` off, keep the row.
    pub async fn deactivate(
        &self,
        day_of_week: u8,
        auth_token: Option<&str>,
    ) -> Result<WorkingDayEntry, ScheduleError> {
        let entry = self
            .get_day(day_of_week, auth_token)
            .await?
            .ok_or(ScheduleError::WorkingDayNotFound(day_of_week))?;

        if !entry.is_working {
            warn!("Deactivating weekday {} which is already non-working", day_of_week);
        }

        let filter = format!("id=eq.{}", entry.id);
        let rows = self
            .store
            .update_where(
                "working_days",
                &filter,
                auth_token,
                json!({
                    "is_working": false,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Database("Working day update returned no row".to_string()))?;

        serde_json::from_value(row).map_err(|e| ScheduleError::Database(e.to_string()))
    }

    async fn fetch_all(&self, auth_token: Option<&str>) -> Result<Vec<WorkingDayEntry>, ScheduleError> {
        let result: Vec<Value> = self
            .store
            .request(
                Method::GET,
                "/rest/v1/working_days?order=day_of_week.asc",
                auth_token,
                None,
            )
            .await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| ScheduleError::Database(e.to_string())))
            .collect()
    }
}
