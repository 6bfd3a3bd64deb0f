use thiserror::Error;

use scheduling_cell::error::ScheduleError;

use crate::models::BookingStatus;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Booking not found")]
    NotFound,

    #[error("Invalid slot label: {0}")]
    InvalidSlotLabel(String),

    #[error("Booking is already {0} and cannot be modified")]
    AlreadyTerminal(BookingStatus),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Bookings can only be cancelled more than {window_hours} hours before the slot")]
    CancellationWindowClosed { window_hours: f64 },

    #[error("Bookings can only be rescheduled more than {window_hours} hours before the slot")]
    RescheduleWindowClosed { window_hours: f64 },

    #[error("Maximum of {max} reschedules already used")]
    MaxReschedulesReached { max: u32 },

    #[error("The requested slot is already taken")]
    SlotTaken,

    #[error("The new time must be at least {window_hours} hours in the future")]
    NewScheduleTooSoon { window_hours: f64 },

    #[error("Order value is below the minimum of {minimum}")]
    BelowMinimumOrderValue { minimum: f64 },

    #[error("Payment has already been completed")]
    AlreadyPaid,

    #[error("Online payment requires order id, payment id and signature")]
    IncompletePaymentData,

    #[error("Payment signature verification failed")]
    InvalidPaymentSignature,

    #[error(transparent)]
    Slot(#[from] ScheduleError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for BookingError {
    fn from(e: anyhow::Error) -> Self {
        BookingError::Database(e.to_string())
    }
}
