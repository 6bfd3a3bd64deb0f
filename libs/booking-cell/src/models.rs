// libs/booking-cell/src/models.rs
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scheduling_cell::models::ClockTime;

use crate::error::BookingError;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub total_amount: f64,
    pub booking_details: BookingDetails,
    #[serde(default)]
    pub rescheduling_details: ReschedulingDetails,
    pub cancellation_details: Option<CancellationDetails>,
    /// Whether this booking holds a counter in the daily slot store. Labels
    /// outside the admin-managed grid are tracked only by the booking row.
    #[serde(default)]
    pub slot_tracked: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// Statuses that hold a slot against other bookings.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::InProgress
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::InProgress => write!(f, "in_progress"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Processing => write!(f, "processing"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
            PaymentStatus::PartiallyRefunded => write!(f, "partially_refunded"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    Cod,
}

/// Who performed a transition. Always an explicit parameter, never inferred
/// from id comparison inside the lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActingRole {
    Customer,
    Admin,
    System,
}

impl fmt::Display for ActingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActingRole::Customer => write!(f, "customer"),
            ActingRole::Admin => write!(f, "admin"),
            ActingRole::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    pub date: NaiveDate,
    /// Customer-facing 12-hour label, e.g. "10:00 AM - 10:45 AM".
    pub slot: String,
    pub duration_minutes: i32,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReschedulingDetails {
    pub original_date: Option<NaiveDate>,
    pub original_slot: Option<String>,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub rescheduled_by: Option<ActingRole>,
    pub reschedule_reason: Option<String>,
    #[serde(default)]
    pub reschedule_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationDetails {
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: ActingRole,
    pub cancellation_reason: String,
    pub refund_eligible: bool,
}

// ==============================================================================
// SLOT LABEL (12-HOUR CUSTOMER GRAMMAR)
// ==============================================================================

static SLOT_LABEL_RE: OnceLock<Regex> = OnceLock::new();

/// Start time of a customer-facing slot label.
///
/// The grammar is "H:MM AM/PM", optionally followed by " - H:MM AM/PM" for a
/// range; only the start matters for window arithmetic. This is a different
/// grammar from the admin 24-hour "HH:MM" slot strings and the two are never
/// conflated; conversion happens only at the counter-coupling seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLabel {
    hour: u32,
    minute: u32,
}

impl SlotLabel {
    pub fn parse(label: &str) -> Result<Self, BookingError> {
        let re = SLOT_LABEL_RE.get_or_init(|| {
            Regex::new(r"^\s*(\d{1,2}):(\d{2})\s*([AaPp][Mm])").unwrap()
        });

        let start_part = label.split(" - ").next().unwrap_or(label);
        let captures = re
            .captures(start_part)
            .ok_or_else(|| BookingError::InvalidSlotLabel(label.to_string()))?;

        let mut hour: u32 = captures[1]
            .parse()
            .map_err(|_| BookingError::InvalidSlotLabel(label.to_string()))?;
        let minute: u32 = captures[2]
            .parse()
            .map_err(|_| BookingError::InvalidSlotLabel(label.to_string()))?;

        if hour < 1 || hour > 12 || minute > 59 {
            return Err(BookingError::InvalidSlotLabel(label.to_string()));
        }

        let is_pm = captures[3].to_ascii_uppercase() == "PM";
        if is_pm && hour != 12 {
            hour += 12;
        } else if !is_pm && hour == 12 {
            hour = 0;
        }

        Ok(Self { hour, minute })
    }

    pub fn to_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
            .expect("slot label hour/minute already validated")
    }

    /// Bridge into the admin grammar, used only to address the matching
    /// counter in the daily slot store.
    pub fn as_clock_time(&self) -> ClockTime {
        ClockTime::from_minutes((self.hour * 60 + self.minute) as u16)
    }

    /// Naive local combination of calendar date and label start; no
    /// timezone conversion, matching how these strings are stored.
    pub fn on_date(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_time())
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub date: NaiveDate,
    pub slot: String,
    pub duration_minutes: i32,
    pub address: Option<String>,
    pub total_amount: f64,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleBookingRequest {
    pub new_date: NaiveDate,
    pub new_slot: String,
    pub new_payment_method: Option<PaymentMethod>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletePaymentRequest {
    pub payment_method: PaymentMethod,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingSearchQuery {
    pub order_number: Option<String>,
    pub address: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpcomingQuery {
    pub hours_ahead: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Booking plus the read-side flags derived from the clock; never stored.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub can_be_cancelled: bool,
    pub can_be_rescheduled: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BookingStats {
    pub total: u32,
    pub pending: u32,
    pub confirmed: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub cancelled: u32,
    pub no_show: u32,
    pub payments_completed: u32,
    pub total_reschedules: u32,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingAnalytics {
    pub stats: BookingStats,
    pub cancellation_rate: f64,
    pub reschedule_rate: f64,
    pub bookings_per_day: Vec<(NaiveDate, u32)>,
}
