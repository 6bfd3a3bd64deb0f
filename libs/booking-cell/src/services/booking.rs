// libs/booking-cell/src/services/booking.rs
use chrono::{Datelike, Local, NaiveDateTime, Utc};
use rand::Rng;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scheduling_cell::error::ScheduleError;
use scheduling_cell::services::slots::DailySlotStoreService;
use settings_cell::models as setting_keys;
use settings_cell::services::settings::BookingSettingsService;
use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::error::BookingError;
use crate::models::{
    ActingRole, Booking, BookingAnalytics, BookingListQuery, BookingSearchQuery, BookingStats,
    BookingStatus, BookingView, CancelBookingRequest, CompletePaymentRequest,
    CreateBookingRequest, PaymentMethod, PaymentStatus, RescheduleBookingRequest, SlotLabel,
    UpdateStatusRequest,
};
use crate::services::lifecycle::{BookingLifecycleService, BookingPolicy};
use crate::services::notifications::{NotificationEvent, NotificationService};
use crate::services::payment::PaymentGatewayService;

pub struct BookingService {
    store: StoreClient,
    slots: DailySlotStoreService,
    settings: BookingSettingsService,
    lifecycle: BookingLifecycleService,
    payments: PaymentGatewayService,
    notifier: NotificationService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            slots: DailySlotStoreService::new(config),
            settings: BookingSettingsService::new(config),
            lifecycle: BookingLifecycleService::new(),
            payments: PaymentGatewayService::new(config),
            notifier: NotificationService::new(config),
        }
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    /// Thresholds from the settings store, defaults where a lookup fails
    /// open. The minimum-order check is only enforced when a value exists.
    pub async fn resolve_policy(&self, auth_token: Option<&str>) -> BookingPolicy {
        let mut policy = BookingPolicy::default();

        policy.minimum_order_value = self
            .settings
            .get_numeric(setting_keys::MINIMUM_ORDER_VALUE, auth_token)
            .await;
        if let Some(v) = self
            .settings
            .get_numeric(setting_keys::MAX_RESCHEDULE_COUNT, auth_token)
            .await
        {
            policy.max_reschedule_count = v as u32;
        }
        if let Some(v) = self
            .settings
            .get_numeric(setting_keys::CANCELLATION_WINDOW_HOURS, auth_token)
            .await
        {
            policy.cancellation_window_hours = v;
        }
        if let Some(v) = self
            .settings
            .get_numeric(setting_keys::RESCHEDULE_WINDOW_HOURS, auth_token)
            .await
        {
            policy.reschedule_window_hours = v;
        }

        policy
    }

    /// Order numbers are minted before persisting, not in a store hook.
    pub fn generate_order_number(&self) -> String {
        let now = Utc::now();
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
        format!("BOOK-{}-{}-{:04}", now.year(), now.timestamp_millis(), suffix)
    }

    // --------------------------------------------------------------------------
    // Create
    // --------------------------------------------------------------------------

    pub async fn create(
        &self,
        user_id: &str,
        request: CreateBookingRequest,
        auth_token: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let label = SlotLabel::parse(&request.slot)?;

        if request.duration_minutes <= 0 {
            return Err(BookingError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }

        let now = self.now();
        if label.on_date(request.date) <= now {
            return Err(BookingError::Validation(
                "Bookings must be scheduled for a future time".to_string(),
            ));
        }

        let policy = self.resolve_policy(auth_token).await;
        if let Some(minimum) = policy.minimum_order_value {
            if request.total_amount < minimum {
                return Err(BookingError::BelowMinimumOrderValue { minimum });
            }
        }

        // Take the capacity counter when the label maps onto the admin slot
        // grid. Labels outside the grid stay untracked; only the booking
        // row's own slot-string conflict check applies to them.
        let slot_tracked = match self
            .slots
            .book_slot_by_start(request.date, label.as_clock_time(), auth_token)
            .await
        {
            Ok(_) => true,
            Err(ScheduleError::SlotSetNotFound(_)) | Err(ScheduleError::SlotNotFound) => {
                warn!(
                    "No managed slot matches {} on {}; booking proceeds untracked",
                    request.slot, request.date
                );
                false
            }
            Err(e) => return Err(BookingError::Slot(e)),
        };

        let order_number = self.generate_order_number();
        let booking_id = Uuid::new_v4();

        let row = json!({
            "id": booking_id,
            "order_number": order_number,
            "user_id": user_id,
            "status": BookingStatus::Pending,
            "payment_status": PaymentStatus::Pending,
            "payment_method": request.payment_method,
            "total_amount": request.total_amount,
            "booking_details": {
                "date": request.date,
                "slot": request.slot,
                "duration_minutes": request.duration_minutes,
                "address": request.address,
            },
            "rescheduling_details": {
                "reschedule_count": 0
            },
            "cancellation_details": null,
            "slot_tracked": slot_tracked,
            "paid_at": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let inserted = match self.store.insert_returning("bookings", auth_token, row).await {
            Ok(rows) => rows,
            Err(e) => {
                if slot_tracked {
                    // Give the counter back; the booking row never landed.
                    if let Err(release_err) = self
                        .slots
                        .release_slot_by_start(request.date, label.as_clock_time(), auth_token)
                        .await
                    {
                        warn!("Failed to release slot after create error: {}", release_err);
                    }
                }
                return Err(BookingError::Database(e.to_string()));
            }
        };

        let booking = parse_booking(
            inserted
                .into_iter()
                .next()
                .ok_or_else(|| BookingError::Database("Booking insert returned no row".to_string()))?,
        )?;

        info!("Booking {} created for user {}", booking.order_number, user_id);
        self.notifier.dispatch(NotificationEvent::BookingCreated, &booking);

        Ok(booking)
    }

    // --------------------------------------------------------------------------
    // Reads
    // --------------------------------------------------------------------------

    pub async fn get_by_id(
        &self,
        booking_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;

        result
            .into_iter()
            .next()
            .ok_or(BookingError::NotFound)
            .and_then(parse_booking)
    }

    /// Attach the clock-derived flags; they are computed per read, never
    /// persisted.
    pub async fn with_flags(&self, booking: Booking, auth_token: Option<&str>) -> BookingView {
        let policy = self.resolve_policy(auth_token).await;
        let now = self.now();

        BookingView {
            can_be_cancelled: self.lifecycle.can_be_cancelled(&policy, &booking, now),
            can_be_rescheduled: self.lifecycle.can_be_rescheduled(&policy, &booking, now),
            booking,
        }
    }

    pub async fn list_by_user(
        &self,
        user_id: &str,
        query: &BookingListQuery,
        auth_token: Option<&str>,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut path = format!("/rest/v1/bookings?user_id=eq.{}", user_id);

        if let Some(status) = query.status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        if let Some(payment_status) = query.payment_status {
            path.push_str(&format!("&payment_status=eq.{}", payment_status));
        }
        if let Some(from) = query.from {
            path.push_str(&format!("&booking_details->>date=gte.{}", from));
        }
        if let Some(to) = query.to {
            path.push_str(&format!("&booking_details->>date=lte.{}", to));
        }

        path.push_str("&order=created_at.desc");
        path.push_str(&format!("&limit={}", query.limit.unwrap_or(20).clamp(1, 100)));
        path.push_str(&format!("&offset={}", query.offset.unwrap_or(0).max(0)));

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;
        result.into_iter().map(parse_booking).collect()
    }

    pub async fn search(
        &self,
        query: &BookingSearchQuery,
        auth_token: Option<&str>,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut path = "/rest/v1/bookings?".to_string();

        if let Some(order_number) = &query.order_number {
            path.push_str(&format!(
                "order_number=ilike.*{}*&",
                urlencoding::encode(order_number)
            ));
        }
        if let Some(address) = &query.address {
            path.push_str(&format!(
                "booking_details->>address=ilike.*{}*&",
                urlencoding::encode(address)
            ));
        }

        path.push_str("order=created_at.desc");
        path.push_str(&format!("&limit={}", query.limit.unwrap_or(20).clamp(1, 100)));
        path.push_str(&format!("&offset={}", query.offset.unwrap_or(0).max(0)));

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;
        result.into_iter().map(parse_booking).collect()
    }

    /// Active bookings whose slot falls inside the next `hours_ahead` hours.
    pub async fn upcoming(
        &self,
        user_id: Option<&str>,
        hours_ahead: i64,
        auth_token: Option<&str>,
    ) -> Result<Vec<Booking>, BookingError> {
        let now = self.now();
        let horizon = now + chrono::Duration::hours(hours_ahead.max(1));

        let mut path = format!(
            "/rest/v1/bookings?status=in.(pending,confirmed)&booking_details->>date=gte.{}",
            now.date()
        );
        if let Some(user_id) = user_id {
            path.push_str(&format!("&user_id=eq.{}", user_id));
        }
        path.push_str("&order=created_at.asc");

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;

        let mut bookings = Vec::new();
        for row in result {
            let booking = parse_booking(row)?;
            match self.lifecycle.booking_datetime(
                booking.booking_details.date,
                &booking.booking_details.slot,
            ) {
                Ok(dt) if dt > now && dt <= horizon => bookings.push(booking),
                Ok(_) => {}
                Err(e) => warn!(
                    "Skipping booking {} with unparseable slot label: {}",
                    booking.order_number, e
                ),
            }
        }

        Ok(bookings)
    }

    // --------------------------------------------------------------------------
    // Transitions
    // --------------------------------------------------------------------------

    pub async fn update_status(
        &self,
        booking_id: Uuid,
        request: UpdateStatusRequest,
        auth_token: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_by_id(booking_id, auth_token).await?;
        self.lifecycle
            .validate_status_transition(booking.status, request.status)?;

        let updated = self
            .patch_booking(
                booking_id,
                json!({
                    "status": request.status,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
                auth_token,
            )
            .await?;

        info!(
            "Booking {} status {} -> {}",
            updated.order_number, booking.status, request.status
        );
        Ok(updated)
    }

    pub async fn cancel(
        &self,
        booking_id: Uuid,
        request: CancelBookingRequest,
        acting_role: ActingRole,
        auth_token: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_by_id(booking_id, auth_token).await?;
        let policy = self.resolve_policy(auth_token).await;
        let now = self.now();

        self.lifecycle.check_cancellable(&policy, &booking, now)?;

        // Eligibility is fixed at this moment: the window held and the
        // payment had gone through.
        let refund_eligible = self.lifecycle.refund_eligible(&booking);

        let updated = self
            .patch_booking(
                booking_id,
                json!({
                    "status": BookingStatus::Cancelled,
                    "cancellation_details": {
                        "cancelled_at": Utc::now().to_rfc3339(),
                        "cancelled_by": acting_role,
                        "cancellation_reason": request.reason,
                        "refund_eligible": refund_eligible,
                    },
                    "updated_at": Utc::now().to_rfc3339(),
                }),
                auth_token,
            )
            .await?;

        if booking.slot_tracked {
            if let Ok(label) = SlotLabel::parse(&booking.booking_details.slot) {
                if let Err(e) = self
                    .slots
                    .release_slot_by_start(
                        booking.booking_details.date,
                        label.as_clock_time(),
                        auth_token,
                    )
                    .await
                {
                    warn!(
                        "Failed to release slot for cancelled booking {}: {}",
                        updated.order_number, e
                    );
                }
            }
        }

        info!(
            "Booking {} cancelled by {} (refund eligible: {})",
            updated.order_number, acting_role, refund_eligible
        );
        self.notifier
            .dispatch(NotificationEvent::BookingCancelled, &updated);

        Ok(updated)
    }

    pub async fn reschedule(
        &self,
        booking_id: Uuid,
        request: RescheduleBookingRequest,
        acting_role: ActingRole,
        auth_token: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_by_id(booking_id, auth_token).await?;
        let policy = self.resolve_policy(auth_token).await;
        let now = self.now();

        self.lifecycle.check_reschedulable(&policy, &booking, now)?;

        SlotLabel::parse(&request.new_slot)?;
        self.lifecycle
            .check_new_schedule(&policy, request.new_date, &request.new_slot, now)?;

        // Soft availability: exact label-string match against other active
        // bookings. Independent of the slot-store counters; the two
        // mechanisms are deliberately not unified.
        if self
            .slot_label_taken(booking_id, request.new_date, &request.new_slot, auth_token)
            .await?
        {
            return Err(BookingError::SlotTaken);
        }

        let resched = &booking.rescheduling_details;
        let (original_date, original_slot) = if resched.reschedule_count == 0 {
            (
                Some(booking.booking_details.date),
                Some(booking.booking_details.slot.clone()),
            )
        } else {
            (resched.original_date, resched.original_slot.clone())
        };

        let mut patch = json!({
            "booking_details": {
                "date": request.new_date,
                "slot": request.new_slot,
                "duration_minutes": booking.booking_details.duration_minutes,
                "address": booking.booking_details.address,
            },
            "rescheduling_details": {
                "original_date": original_date,
                "original_slot": original_slot,
                "rescheduled_at": Utc::now().to_rfc3339(),
                "rescheduled_by": acting_role,
                "reschedule_reason": request.reason,
                "reschedule_count": resched.reschedule_count + 1,
            },
            "updated_at": Utc::now().to_rfc3339(),
        });
        if let Some(method) = request.new_payment_method {
            patch["payment_method"] = json!(method);
        }

        let updated = self.patch_booking(booking_id, patch, auth_token).await?;

        info!(
            "Booking {} rescheduled to {} {} by {} ({} of {} used)",
            updated.order_number,
            request.new_date,
            updated.booking_details.slot,
            acting_role,
            updated.rescheduling_details.reschedule_count,
            policy.max_reschedule_count
        );
        self.notifier
            .dispatch(NotificationEvent::BookingRescheduled, &updated);

        Ok(updated)
    }

    pub async fn complete_payment(
        &self,
        booking_id: Uuid,
        request: CompletePaymentRequest,
        auth_token: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_by_id(booking_id, auth_token).await?;

        if booking.payment_status == PaymentStatus::Completed {
            return Err(BookingError::AlreadyPaid);
        }

        match request.payment_method {
            PaymentMethod::Cod => {
                // Cash on delivery: record the method, payment happens
                // out of band later.
                let updated = self
                    .patch_booking(
                        booking_id,
                        json!({
                            "payment_method": PaymentMethod::Cod,
                            "updated_at": Utc::now().to_rfc3339(),
                        }),
                        auth_token,
                    )
                    .await?;
                debug!("Booking {} switched to cash on delivery", updated.order_number);
                Ok(updated)
            }
            PaymentMethod::Online => {
                let (order_id, payment_id, signature) = match (
                    &request.razorpay_order_id,
                    &request.razorpay_payment_id,
                    &request.razorpay_signature,
                ) {
                    (Some(o), Some(p), Some(s)) => (o, p, s),
                    _ => return Err(BookingError::IncompletePaymentData),
                };

                self.payments.verify_signature(order_id, payment_id, signature)?;

                let mut patch = json!({
                    "payment_status": PaymentStatus::Completed,
                    "payment_method": PaymentMethod::Online,
                    "paid_at": Utc::now().to_rfc3339(),
                    "updated_at": Utc::now().to_rfc3339(),
                });
                if booking.status == BookingStatus::Pending {
                    patch["status"] = json!(BookingStatus::Confirmed);
                }

                let updated = self.patch_booking(booking_id, patch, auth_token).await?;

                info!("Booking {} payment completed", updated.order_number);
                self.notifier
                    .dispatch(NotificationEvent::PaymentCompleted, &updated);
                Ok(updated)
            }
        }
    }

    // --------------------------------------------------------------------------
    // Aggregations
    // --------------------------------------------------------------------------

    pub async fn stats(
        &self,
        from: Option<chrono::NaiveDate>,
        to: Option<chrono::NaiveDate>,
        auth_token: Option<&str>,
    ) -> Result<BookingStats, BookingError> {
        let bookings = self.fetch_range(from, to, auth_token).await?;
        Ok(fold_stats(&bookings))
    }

    pub async fn analytics(
        &self,
        from: Option<chrono::NaiveDate>,
        to: Option<chrono::NaiveDate>,
        auth_token: Option<&str>,
    ) -> Result<BookingAnalytics, BookingError> {
        let bookings = self.fetch_range(from, to, auth_token).await?;
        let stats = fold_stats(&bookings);

        let total = stats.total.max(1) as f64;
        let mut per_day: Vec<(chrono::NaiveDate, u32)> = Vec::new();
        for booking in &bookings {
            let date = booking.booking_details.date;
            match per_day.iter_mut().find(|(d, _)| *d == date) {
                Some((_, count)) => *count += 1,
                None => per_day.push((date, 1)),
            }
        }
        per_day.sort_by_key(|(d, _)| *d);

        Ok(BookingAnalytics {
            cancellation_rate: stats.cancelled as f64 / total,
            reschedule_rate: stats.total_reschedules as f64 / total,
            bookings_per_day: per_day,
            stats,
        })
    }

    // --------------------------------------------------------------------------
    // Internals
    // --------------------------------------------------------------------------

    async fn fetch_range(
        &self,
        from: Option<chrono::NaiveDate>,
        to: Option<chrono::NaiveDate>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut path = "/rest/v1/bookings?order=created_at.asc".to_string();
        if let Some(from) = from {
            path.push_str(&format!("&booking_details->>date=gte.{}", from));
        }
        if let Some(to) = to {
            path.push_str(&format!("&booking_details->>date=lte.{}", to));
        }

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;
        result.into_iter().map(parse_booking).collect()
    }

    async fn slot_label_taken(
        &self,
        exclude_id: Uuid,
        date: chrono::NaiveDate,
        slot: &str,
        auth_token: Option<&str>,
    ) -> Result<bool, BookingError> {
        let path = format!(
            "/rest/v1/bookings?booking_details->>date=eq.{}&booking_details->>slot=eq.{}&status=in.(pending,confirmed,in_progress)&id=neq.{}",
            date,
            urlencoding::encode(slot),
            exclude_id
        );

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;
        Ok(!result.is_empty())
    }

    async fn patch_booking(
        &self,
        booking_id: Uuid,
        body: Value,
        auth_token: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let filter = format!("id=eq.{}", booking_id);
        let rows = self
            .store
            .update_where("bookings", &filter, auth_token, body)
            .await?;

        rows.into_iter()
            .next()
            .ok_or(BookingError::NotFound)
            .and_then(parse_booking)
    }
}

fn parse_booking(row: Value) -> Result<Booking, BookingError> {
    serde_json::from_value(row).map_err(|e| BookingError::Database(e.to_string()))
}

fn fold_stats(bookings: &[Booking]) -> BookingStats {
    let mut stats = BookingStats::default();

    for booking in bookings {
        stats.total += 1;
        match booking.status {
            BookingStatus::Pending => stats.pending += 1,
            BookingStatus::Confirmed => stats.confirmed += 1,
            BookingStatus::InProgress => stats.in_progress += 1,
            BookingStatus::Completed => stats.completed += 1,
            BookingStatus::Cancelled => stats.cancelled += 1,
            BookingStatus::NoShow => stats.no_show += 1,
        }
        if booking.payment_status == PaymentStatus::Completed {
            stats.payments_completed += 1;
            stats.revenue += booking.total_amount;
        }
        stats.total_reschedules += booking.rescheduling_details.reschedule_count;
    }

    stats
}
