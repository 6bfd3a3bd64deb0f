// libs/booking-cell/src/services/lifecycle.rs
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::BookingError;
use crate::models::{Booking, BookingStatus, PaymentStatus, SlotLabel};

/// Numeric thresholds governing the legality windows. Values come from the
/// settings store when available; these defaults apply when a lookup fails
/// open or no row exists.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// `None` disables the minimum-order check entirely.
    pub minimum_order_value: Option<f64>,
    pub max_reschedule_count: u32,
    pub cancellation_window_hours: f64,
    pub reschedule_window_hours: f64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            minimum_order_value: None,
            max_reschedule_count: 3,
            cancellation_window_hours: 2.0,
            reschedule_window_hours: 4.0,
        }
    }
}

/// Pure state machine over booking status and the time-window legality
/// rules. Every check takes `now` as a parameter so callers own the clock.
pub struct BookingLifecycleService;

impl BookingLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Combine the naive calendar date with the slot label's start into one
    /// naive timestamp. Local-clock arithmetic; no timezone is ever applied.
    pub fn booking_datetime(
        &self,
        date: NaiveDate,
        slot: &str,
    ) -> Result<NaiveDateTime, BookingError> {
        Ok(SlotLabel::parse(slot)?.on_date(date))
    }

    /// Fractional hours from `now` until the booking's slot. Negative once
    /// the slot has passed.
    pub fn hours_until(
        &self,
        now: NaiveDateTime,
        date: NaiveDate,
        slot: &str,
    ) -> Result<f64, BookingError> {
        let booking_dt = self.booking_datetime(date, slot)?;
        Ok((booking_dt - now).num_milliseconds() as f64 / 3_600_000.0)
    }

    pub fn get_valid_transitions(&self, current: BookingStatus) -> Vec<BookingStatus> {
        match current {
            BookingStatus::Pending => vec![
                BookingStatus::Confirmed,
                BookingStatus::Cancelled,
                BookingStatus::NoShow,
            ],
            BookingStatus::Confirmed => vec![
                BookingStatus::InProgress,
                BookingStatus::Cancelled,
                BookingStatus::NoShow,
            ],
            BookingStatus::InProgress => vec![
                BookingStatus::Completed,
                BookingStatus::Cancelled,
                BookingStatus::NoShow,
            ],
            // Terminal states
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow => vec![],
        }
    }

    pub fn validate_status_transition(
        &self,
        current: BookingStatus,
        new: BookingStatus,
    ) -> Result<(), BookingError> {
        debug!("Validating status transition {} -> {}", current, new);

        if !self.get_valid_transitions(current).contains(&new) {
            warn!("Invalid status transition attempted: {} -> {}", current, new);
            return Err(BookingError::InvalidStatusTransition {
                from: current,
                to: new,
            });
        }
        Ok(())
    }

    /// Cancellation legality. Terminal state and closed window are distinct
    /// errors so callers can message them differently.
    pub fn check_cancellable(
        &self,
        policy: &BookingPolicy,
        booking: &Booking,
        now: NaiveDateTime,
    ) -> Result<(), BookingError> {
        if booking.status.is_terminal() {
            return Err(BookingError::AlreadyTerminal(booking.status));
        }

        let hours = self.hours_until(now, booking.booking_details.date, &booking.booking_details.slot)?;
        if hours <= policy.cancellation_window_hours {
            return Err(BookingError::CancellationWindowClosed {
                window_hours: policy.cancellation_window_hours,
            });
        }

        Ok(())
    }

    /// Reschedule legality against the booking's current schedule.
    pub fn check_reschedulable(
        &self,
        policy: &BookingPolicy,
        booking: &Booking,
        now: NaiveDateTime,
    ) -> Result<(), BookingError> {
        if booking.status.is_terminal() {
            return Err(BookingError::AlreadyTerminal(booking.status));
        }

        if booking.rescheduling_details.reschedule_count >= policy.max_reschedule_count {
            return Err(BookingError::MaxReschedulesReached {
                max: policy.max_reschedule_count,
            });
        }

        let hours = self.hours_until(now, booking.booking_details.date, &booking.booking_details.slot)?;
        if hours <= policy.reschedule_window_hours {
            return Err(BookingError::RescheduleWindowClosed {
                window_hours: policy.reschedule_window_hours,
            });
        }

        Ok(())
    }

    /// The new date/slot must be in the future by at least the reschedule
    /// window; the same constant bounds both directions.
    pub fn check_new_schedule(
        &self,
        policy: &BookingPolicy,
        new_date: NaiveDate,
        new_slot: &str,
        now: NaiveDateTime,
    ) -> Result<(), BookingError> {
        let hours = self.hours_until(now, new_date, new_slot)?;
        if hours <= 0.0 {
            return Err(BookingError::Validation(
                "The new booking time must be in the future".to_string(),
            ));
        }
        if hours <= policy.reschedule_window_hours {
            return Err(BookingError::NewScheduleTooSoon {
                window_hours: policy.reschedule_window_hours,
            });
        }
        Ok(())
    }

    /// Refund eligibility at the moment of cancellation: the payment went
    /// through and the cancellation itself was legal.
    pub fn refund_eligible(&self, booking: &Booking) -> bool {
        booking.payment_status == PaymentStatus::Completed
    }

    // Read-side derived flags; never stored.

    pub fn can_be_cancelled(
        &self,
        policy: &BookingPolicy,
        booking: &Booking,
        now: NaiveDateTime,
    ) -> bool {
        self.check_cancellable(policy, booking, now).is_ok()
    }

    pub fn can_be_rescheduled(
        &self,
        policy: &BookingPolicy,
        booking: &Booking,
        now: NaiveDateTime,
    ) -> bool {
        self.check_reschedulable(policy, booking, now).is_ok()
    }
}

impl Default for BookingLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
