use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No working day configured for weekday {0}")]
    WorkingDayNotFound(u8),

    #[error("No slot set exists for {0}")]
    SlotSetNotFound(NaiveDate),

    #[error("A slot set already exists for {0}")]
    DuplicateDate(NaiveDate),

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot overlaps an existing slot")]
    SlotOverlap,

    #[error("Slot has active bookings")]
    SlotHasBookings,

    #[error("Slot set has active bookings")]
    SetHasBookings,

    #[error("Slot is not open for booking")]
    SlotNotAvailable,

    #[error("Slot is fully booked")]
    SlotFull,

    #[error("Slot has no bookings to release")]
    NoActiveBookings,

    #[error("Concurrent update lost after retries")]
    ConcurrencyConflict,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for ScheduleError {
    fn from(e: anyhow::Error) -> Self {
        ScheduleError::Database(e.to_string())
    }
}
