// libs/scheduling-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ScheduleError;

// ==============================================================================
// CLOCK TIME VALUE TYPE
// ==============================================================================

/// Naive wall-clock time of day in the admin "HH:MM" 24-hour grammar.
///
/// All comparisons are minutes-since-midnight; these strings are never
/// timezone-adjusted anywhere in the platform. Serialized back to the plain
/// "HH:MM" string the store expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::Validation(format!(
                "Invalid time {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn to_minutes(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    /// Inverse of `to_minutes`. Caller guarantees `total < 1440`; slot
    /// generation only ever passes values below a validated end time.
    pub fn from_minutes(total: u16) -> Self {
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
        }
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| ScheduleError::Validation(format!("Invalid time string '{}'", s)))?;
        let hour: u8 = h
            .parse()
            .map_err(|_| ScheduleError::Validation(format!("Invalid hour in '{}'", s)))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| ScheduleError::Validation(format!("Invalid minute in '{}'", s)))?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// WORKING DAY CALENDAR
// ==============================================================================

/// Per-weekday operating template. Sunday = 0. Removed days are soft-deleted
/// by flipping `is_working` to false, never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingDayEntry {
    pub id: Uuid,
    pub day_of_week: u8,
    pub is_working: bool,
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    pub break_start: Option<ClockTime>,
    pub break_end: Option<ClockTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkingDayEntry {
    /// Synthesized non-working placeholder for weekdays with no stored entry.
    pub fn default_for(day_of_week: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            day_of_week,
            is_working: false,
            start_time: None,
            end_time: None,
            break_start: None,
            break_end: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertWorkingDayRequest {
    pub is_working: bool,
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    pub break_start: Option<ClockTime>,
    pub break_end: Option<ClockTime>,
}

impl UpsertWorkingDayRequest {
    /// Write-time invariants: operating window ordered, break window inside
    /// the operating window, both break ends present or neither.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !self.is_working {
            return Ok(());
        }

        let (start, end) = match (self.start_time, self.end_time) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Err(ScheduleError::Validation(
                    "Working days require start_time and end_time".to_string(),
                ))
            }
        };

        if end.to_minutes() <= start.to_minutes() {
            return Err(ScheduleError::Validation(
                "end_time must be after start_time".to_string(),
            ));
        }

        match (self.break_start, self.break_end) {
            (None, None) => Ok(()),
            (Some(bs), Some(be)) => {
                if be.to_minutes() <= bs.to_minutes() {
                    return Err(ScheduleError::Validation(
                        "break_end must be after break_start".to_string(),
                    ));
                }
                if bs < start || be > end {
                    return Err(ScheduleError::Validation(
                        "Break window must lie within the working window".to_string(),
                    ));
                }
                Ok(())
            }
            _ => Err(ScheduleError::Validation(
                "break_start and break_end must be provided together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkWorkingDayUpdate {
    pub day_of_week: u8,
    #[serde(flatten)]
    pub entry: UpsertWorkingDayRequest,
}

// ==============================================================================
// DAILY SLOT SET
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub max_bookings: u32,
    pub current_bookings: u32,
    pub is_available: bool,
}

impl TimeSlot {
    /// Half-open interval overlap test on [start, end).
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn has_capacity(&self) -> bool {
        self.is_available && self.current_bookings < self.max_bookings
    }
}

/// Materialized slot set for one calendar date; the single shared mutable
/// resource for capacity tracking. `version` guards every counter mutation
/// with a compare-and-swap at the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySlotSet {
    pub id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
    pub version: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailySlotSet {
    pub fn find_slot(&self, slot_id: Uuid) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    pub fn find_slot_by_start(&self, start: ClockTime) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.start_time == start)
    }

    pub fn has_any_bookings(&self) -> bool {
        self.slots.iter().any(|s| s.current_bookings > 0)
    }

    pub fn available_slots(&self) -> Vec<&TimeSlot> {
        self.slots.iter().filter(|s| s.has_capacity()).collect()
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSlot {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub max_bookings: u32,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

impl NewSlot {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.end_time.to_minutes() <= self.start_time.to_minutes() {
            return Err(ScheduleError::Validation(
                "Slot end_time must be after start_time".to_string(),
            ));
        }
        if self.max_bookings < 1 {
            return Err(ScheduleError::Validation(
                "max_bookings must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_slot(self) -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4(),
            start_time: self.start_time,
            end_time: self.end_time,
            max_bookings: self.max_bookings,
            current_bookings: 0,
            is_available: self.is_available,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotSetRequest {
    pub date: NaiveDate,
    pub slots: Vec<NewSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSlotSetRequest {
    pub slots: Vec<NewSlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotStatistics {
    pub days: u32,
    pub total_slots: u32,
    pub total_capacity: u32,
    pub total_booked: u32,
    pub fully_booked_slots: u32,
    pub disabled_slots: u32,
}
