// libs/scheduling-cell/src/services/slots.rs
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::error::ScheduleError;
use crate::models::{ClockTime, DailySlotSet, NewSlot, SlotStatistics, TimeSlot};

const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Per-date materialized slot sets with booking counters.
///
/// Every mutation is a read, an in-memory rewrite of the slot array, and a
/// conditional PATCH filtered on both `id` and the previously read `version`.
/// An empty representation means a concurrent writer advanced the version
/// first; counter mutations retry with backoff, structural admin edits
/// surface the conflict.
pub struct DailySlotStoreService {
    store: StoreClient,
    max_retry_attempts: u32,
}

impl DailySlotStoreService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
        }
    }

    // --------------------------------------------------------------------------
    // Reads
    // --------------------------------------------------------------------------

    pub async fn fetch_for_date(
        &self,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Option<DailySlotSet>, ScheduleError> {
        let path = format!("/rest/v1/daily_slot_sets?date=eq.{}", date);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;

        match result.into_iter().next() {
            Some(row) => Ok(Some(parse_set(row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_for_date(
        &self,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<DailySlotSet, ScheduleError> {
        self.fetch_for_date(date, auth_token)
            .await?
            .ok_or(ScheduleError::SlotSetNotFound(date))
    }

    pub async fn get_for_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<DailySlotSet>, ScheduleError> {
        if to < from {
            return Err(ScheduleError::Validation(
                "Range end must not precede range start".to_string(),
            ));
        }

        let path = format!(
            "/rest/v1/daily_slot_sets?date=gte.{}&date=lte.{}&order=date.asc",
            from, to
        );
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;

        result.into_iter().map(parse_set).collect()
    }

    /// Bookable slots for a date: available and below capacity. A date with
    /// no materialized set simply has nothing bookable.
    pub async fn get_available(
        &self,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        match self.fetch_for_date(date, auth_token).await? {
            Some(set) => Ok(set
                .slots
                .iter()
                .filter(|s| s.has_capacity())
                .cloned()
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    pub async fn statistics(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<SlotStatistics, ScheduleError> {
        let sets = self.get_for_range(from, to, auth_token).await?;

        let mut stats = SlotStatistics {
            days: sets.len() as u32,
            total_slots: 0,
            total_capacity: 0,
            total_booked: 0,
            fully_booked_slots: 0,
            disabled_slots: 0,
        };

        for set in &sets {
            for slot in &set.slots {
                stats.total_slots += 1;
                stats.total_capacity += slot.max_bookings;
                stats.total_booked += slot.current_bookings;
                if slot.current_bookings >= slot.max_bookings {
                    stats.fully_booked_slots += 1;
                }
                if !slot.is_available {
                    stats.disabled_slots += 1;
                }
            }
        }

        Ok(stats)
    }

    // --------------------------------------------------------------------------
    // Structural writes
    // --------------------------------------------------------------------------

    /// One aggregate per calendar date. A racing creator that loses the
    /// insert gets `DuplicateDate`, not a fatal error.
    pub async fn create_for_date(
        &self,
        date: NaiveDate,
        slots: Vec<TimeSlot>,
        created_by: &str,
        auth_token: Option<&str>,
    ) -> Result<DailySlotSet, ScheduleError> {
        validate_slot_invariants(&slots)?;

        if self.fetch_for_date(date, auth_token).await?.is_some() {
            return Err(ScheduleError::DuplicateDate(date));
        }

        debug!("Creating slot set for {} ({} slots)", date, slots.len());

        let rows = self
            .store
            .insert_returning(
                "daily_slot_sets",
                auth_token,
                json!({
                    "id": uuid::Uuid::new_v4(),
                    "date": date,
                    "slots": slots,
                    "version": 0,
                    "created_by": created_by,
                    "created_at": Utc::now().to_rfc3339(),
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.starts_with("Conflict") {
                    ScheduleError::DuplicateDate(date)
                } else {
                    ScheduleError::Database(msg)
                }
            })?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Database("Slot set insert returned no row".to_string()))?;
        parse_set(row)
    }

    /// Wholesale slot replacement; refused once any slot carries bookings.
    pub async fn update_for_date(
        &self,
        date: NaiveDate,
        new_slots: Vec<NewSlot>,
        auth_token: Option<&str>,
    ) -> Result<DailySlotSet, ScheduleError> {
        let set = self.get_for_date(date, auth_token).await?;
        if set.has_any_bookings() {
            return Err(ScheduleError::SetHasBookings);
        }

        for slot in &new_slots {
            slot.validate()?;
        }
        let slots: Vec<TimeSlot> = new_slots.into_iter().map(NewSlot::into_slot).collect();
        validate_slot_invariants(&slots)?;

        self.cas_write(&set, slots, auth_token)
            .await?
            .ok_or(ScheduleError::ConcurrencyConflict)
    }

    pub async fn add_slot(
        &self,
        date: NaiveDate,
        new_slot: NewSlot,
        auth_token: Option<&str>,
    ) -> Result<DailySlotSet, ScheduleError> {
        new_slot.validate()?;
        let set = self.get_for_date(date, auth_token).await?;

        let candidate = new_slot.into_slot();
        if set.slots.iter().any(|s| s.overlaps(&candidate)) {
            return Err(ScheduleError::SlotOverlap);
        }

        let mut slots = set.slots.clone();
        slots.push(candidate);
        slots.sort_by_key(|s| s.start_time);

        self.cas_write(&set, slots, auth_token)
            .await?
            .ok_or(ScheduleError::ConcurrencyConflict)
    }

    pub async fn remove_slot(
        &self,
        date: NaiveDate,
        slot_id: uuid::Uuid,
        auth_token: Option<&str>,
    ) -> Result<DailySlotSet, ScheduleError> {
        let set = self.get_for_date(date, auth_token).await?;

        let slot = set.find_slot(slot_id).ok_or(ScheduleError::SlotNotFound)?;
        if slot.current_bookings > 0 {
            return Err(ScheduleError::SlotHasBookings);
        }

        let slots: Vec<TimeSlot> = set
            .slots
            .iter()
            .filter(|s| s.id != slot_id)
            .cloned()
            .collect();

        self.cas_write(&set, slots, auth_token)
            .await?
            .ok_or(ScheduleError::ConcurrencyConflict)
    }

    /// Drop the whole aggregate for a date; only legal while untouched by
    /// bookings.
    pub async fn delete_for_date(
        &self,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<(), ScheduleError> {
        let set = self.get_for_date(date, auth_token).await?;
        if set.has_any_bookings() {
            return Err(ScheduleError::SetHasBookings);
        }

        let filter = format!("id=eq.{}", set.id);
        let deleted = self
            .store
            .delete_where("daily_slot_sets", &filter, auth_token)
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))?;

        if deleted.is_empty() {
            return Err(ScheduleError::SlotSetNotFound(date));
        }
        Ok(())
    }

    // --------------------------------------------------------------------------
    // Counter mutations
    // --------------------------------------------------------------------------

    /// Atomically take one booking on a slot. Retries the compare-and-swap a
    /// bounded number of times so that racing callers serialize; at most
    /// `max_bookings` of them can ever succeed.
    pub async fn book_slot(
        &self,
        date: NaiveDate,
        slot_id: uuid::Uuid,
        auth_token: Option<&str>,
    ) -> Result<TimeSlot, ScheduleError> {
        for attempt in 1..=self.max_retry_attempts {
            let set = self.get_for_date(date, auth_token).await?;
            let slot = set.find_slot(slot_id).ok_or(ScheduleError::SlotNotFound)?;

            if !slot.is_available {
                return Err(ScheduleError::SlotNotAvailable);
            }
            if slot.current_bookings >= slot.max_bookings {
                return Err(ScheduleError::SlotFull);
            }

            let slots = with_counter(&set.slots, slot_id, slot.current_bookings + 1);
            match self.cas_write(&set, slots, auth_token).await? {
                Some(updated) => {
                    debug!("Booked slot {} on {} (attempt {})", slot_id, date, attempt);
                    return updated
                        .find_slot(slot_id)
                        .cloned()
                        .ok_or(ScheduleError::SlotNotFound);
                }
                None => {
                    warn!(
                        "Slot booking lost version race on {} (attempt {}/{})",
                        date, attempt, self.max_retry_attempts
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(50 * attempt as u64)).await;
                }
            }
        }

        Err(ScheduleError::ConcurrencyConflict)
    }

    /// Atomically give back one booking on a slot.
    pub async fn release_slot(
        &self,
        date: NaiveDate,
        slot_id: uuid::Uuid,
        auth_token: Option<&str>,
    ) -> Result<TimeSlot, ScheduleError> {
        for attempt in 1..=self.max_retry_attempts {
            let set = self.get_for_date(date, auth_token).await?;
            let slot = set.find_slot(slot_id).ok_or(ScheduleError::SlotNotFound)?;

            if slot.current_bookings == 0 {
                return Err(ScheduleError::NoActiveBookings);
            }

            let slots = with_counter(&set.slots, slot_id, slot.current_bookings - 1);
            match self.cas_write(&set, slots, auth_token).await? {
                Some(updated) => {
                    return updated
                        .find_slot(slot_id)
                        .cloned()
                        .ok_or(ScheduleError::SlotNotFound);
                }
                None => {
                    warn!(
                        "Slot release lost version race on {} (attempt {}/{})",
                        date, attempt, self.max_retry_attempts
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(50 * attempt as u64)).await;
                }
            }
        }

        Err(ScheduleError::ConcurrencyConflict)
    }

    /// Resolve a slot by its start time, then book it. Used by the booking
    /// flow, where customers reference slots by their label's start.
    pub async fn book_slot_by_start(
        &self,
        date: NaiveDate,
        start: ClockTime,
        auth_token: Option<&str>,
    ) -> Result<TimeSlot, ScheduleError> {
        let set = self.get_for_date(date, auth_token).await?;
        let slot = set
            .find_slot_by_start(start)
            .ok_or(ScheduleError::SlotNotFound)?;
        self.book_slot(date, slot.id, auth_token).await
    }

    pub async fn release_slot_by_start(
        &self,
        date: NaiveDate,
        start: ClockTime,
        auth_token: Option<&str>,
    ) -> Result<TimeSlot, ScheduleError> {
        let set = self.get_for_date(date, auth_token).await?;
        let slot = set
            .find_slot_by_start(start)
            .ok_or(ScheduleError::SlotNotFound)?;
        self.release_slot(date, slot.id, auth_token).await
    }

    // --------------------------------------------------------------------------
    // Internals
    // --------------------------------------------------------------------------

    async fn cas_write(
        &self,
        set: &DailySlotSet,
        new_slots: Vec<TimeSlot>,
        auth_token: Option<&str>,
    ) -> Result<Option<DailySlotSet>, ScheduleError> {
        let filter = format!("id=eq.{}&version=eq.{}", set.id, set.version);
        let rows = self
            .store
            .update_where(
                "daily_slot_sets",
                &filter,
                auth_token,
                json!({
                    "slots": new_slots,
                    "version": set.version + 1,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(parse_set(row)?)),
            None => Ok(None),
        }
    }
}

fn parse_set(row: Value) -> Result<DailySlotSet, ScheduleError> {
    serde_json::from_value(row).map_err(|e| ScheduleError::Database(e.to_string()))
}

fn with_counter(slots: &[TimeSlot], slot_id: uuid::Uuid, current_bookings: u32) -> Vec<TimeSlot> {
    slots
        .iter()
        .map(|s| {
            if s.id == slot_id {
                let mut updated = s.clone();
                updated.current_bookings = current_bookings;
                updated
            } else {
                s.clone()
            }
        })
        .collect()
}

fn validate_slot_invariants(slots: &[TimeSlot]) -> Result<(), ScheduleError> {
    for slot in slots {
        if slot.end_time.to_minutes() <= slot.start_time.to_minutes() {
            return Err(ScheduleError::Validation(
                "Slot end_time must be after start_time".to_string(),
            ));
        }
        if slot.max_bookings < 1 {
            return Err(ScheduleError::Validation(
                "max_bookings must be at least 1".to_string(),
            ));
        }
        if slot.current_bookings > slot.max_bookings {
            return Err(ScheduleError::Validation(
                "current_bookings exceeds max_bookings".to_string(),
            ));
        }
    }

    for (i, a) in slots.iter().enumerate() {
        for b in slots.iter().skip(i + 1) {
            if a.overlaps(b) {
                return Err(ScheduleError::SlotOverlap);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn slot(start: &str, end: &str) -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4(),
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
            max_bookings: 5,
            current_bookings: 0,
            is_available: true,
        }
    }

    #[test]
    fn overlap_test_is_half_open() {
        let a = slot("09:00", "10:00");
        let b = slot("10:00", "11:00");
        assert!(!a.overlaps(&b));

        let c = slot("09:30", "10:30");
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn invariant_check_rejects_overlapping_sets() {
        let slots = vec![slot("09:00", "10:00"), slot("09:45", "10:45")];
        assert!(matches!(
            validate_slot_invariants(&slots),
            Err(ScheduleError::SlotOverlap)
        ));
    }

    #[test]
    fn invariant_check_rejects_counter_over_capacity() {
        let mut s = slot("09:00", "10:00");
        s.current_bookings = 6;
        assert!(matches!(
            validate_slot_invariants(&[s]),
            Err(ScheduleError::Validation(_))
        ));
    }

    #[test]
    fn with_counter_touches_only_the_target() {
        let a = slot("09:00", "10:00");
        let b = slot("10:00", "11:00");
        let updated = with_counter(&[a.clone(), b.clone()], a.id, 3);

        assert_eq!(updated[0].current_bookings, 3);
        assert_eq!(updated[1].current_bookings, 0);
    }
}
