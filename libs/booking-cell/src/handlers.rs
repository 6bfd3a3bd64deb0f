// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use scheduling_cell::error::ScheduleError;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::error::BookingError;
use crate::models::{
    ActingRole, Booking, BookingListQuery, BookingSearchQuery, CancelBookingRequest,
    CompletePaymentRequest, CreateBookingRequest, RescheduleBookingRequest, StatsQuery,
    UpcomingQuery, UpdateStatusRequest,
};
use crate::services::booking::BookingService;

fn map_booking_error(e: BookingError, config: &AppConfig) -> AppError {
    match &e {
        BookingError::Validation(_)
        | BookingError::InvalidSlotLabel(_)
        | BookingError::IncompletePaymentData => AppError::ValidationError(e.to_string()),

        BookingError::NotFound => AppError::NotFound(e.to_string()),

        // Timing-window rejections carry the threshold and a way to reach a
        // human, since the caller cannot fix them by retrying.
        BookingError::CancellationWindowClosed { .. }
        | BookingError::RescheduleWindowClosed { .. }
        | BookingError::NewScheduleTooSoon { .. } => AppError::RuleViolation(format!(
            "{}. For assistance contact {}",
            e, config.support_contact
        )),

        BookingError::AlreadyTerminal(_)
        | BookingError::InvalidStatusTransition { .. }
        | BookingError::MaxReschedulesReached { .. }
        | BookingError::BelowMinimumOrderValue { .. }
        | BookingError::AlreadyPaid => AppError::RuleViolation(e.to_string()),

        BookingError::SlotTaken => AppError::Conflict(e.to_string()),

        BookingError::InvalidPaymentSignature => AppError::ExternalService(e.to_string()),

        BookingError::Slot(inner) => match inner {
            ScheduleError::SlotFull | ScheduleError::SlotNotAvailable => {
                AppError::Conflict(inner.to_string())
            }
            ScheduleError::ConcurrencyConflict => AppError::Conflict(inner.to_string()),
            other => AppError::Internal(other.to_string()),
        },

        BookingError::Database(msg) => AppError::Database(msg.clone()),
    }
}

fn acting_role(user: &User) -> ActingRole {
    if user.is_admin() {
        ActingRole::Admin
    } else {
        ActingRole::Customer
    }
}

fn authorize_on(booking: &Booking, user: &User) -> Result<(), AppError> {
    if !user.is_admin() && booking.user_id != user.id {
        return Err(AppError::Auth(
            "Not authorized to act on this booking".to_string(),
        ));
    }
    Ok(())
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin role required".to_string()));
    }
    Ok(())
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .create(&user.id, request, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking created"
    })))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .get_by_id(booking_id, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    authorize_on(&booking, &user)?;

    let view = service.with_flags(booking, Some(auth.token())).await;

    Ok(Json(json!({
        "success": true,
        "booking": view
    })))
}

#[axum::debug_handler]
pub async fn list_user_bookings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<String>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() && user.id != user_id {
        return Err(AppError::Auth(
            "Not authorized to list bookings for this user".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let bookings = service
        .list_by_user(&user_id, &query, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "count": bookings.len(),
        "bookings": bookings
    })))
}

#[axum::debug_handler]
pub async fn update_booking_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = BookingService::new(&state);
    let booking = service
        .update_status(booking_id, request, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let booking = service
        .get_by_id(booking_id, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;
    authorize_on(&booking, &user)?;

    let cancelled = service
        .cancel(booking_id, request, acting_role(&user), Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "booking": cancelled,
        "message": "Booking cancelled"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RescheduleBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let booking = service
        .get_by_id(booking_id, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;
    authorize_on(&booking, &user)?;

    let rescheduled = service
        .reschedule(booking_id, request, acting_role(&user), Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "booking": rescheduled,
        "message": "Booking rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn complete_payment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CompletePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let booking = service
        .get_by_id(booking_id, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;
    authorize_on(&booking, &user)?;

    let updated = service
        .complete_payment(booking_id, request, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "booking": updated
    })))
}

#[axum::debug_handler]
pub async fn get_upcoming_bookings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    // Admins see the whole horizon; customers only their own bookings.
    let user_filter = if user.is_admin() { None } else { Some(user.id.as_str()) };
    let bookings = service
        .upcoming(user_filter, query.hours_ahead.unwrap_or(48), Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "count": bookings.len(),
        "bookings": bookings
    })))
}

#[axum::debug_handler]
pub async fn search_bookings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<BookingSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = BookingService::new(&state);
    let bookings = service
        .search(&query, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "count": bookings.len(),
        "bookings": bookings
    })))
}

#[axum::debug_handler]
pub async fn get_booking_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = BookingService::new(&state);
    let stats = service
        .stats(query.from, query.to, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "stats": stats
    })))
}

#[axum::debug_handler]
pub async fn get_booking_analytics(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = BookingService::new(&state);
    let analytics = service
        .analytics(query.from, query.to, Some(auth.token()))
        .await
        .map_err(|e| map_booking_error(e, &state))?;

    Ok(Json(json!({
        "success": true,
        "analytics": analytics
    })))
}
