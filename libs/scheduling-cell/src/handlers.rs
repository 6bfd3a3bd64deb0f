// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::error::ScheduleError;
use crate::models::{
    BulkWorkingDayUpdate, CreateSlotSetRequest, DateRangeQuery, NewSlot, UpdateSlotSetRequest,
    UpsertWorkingDayRequest,
};
use crate::services::calendar::WorkingDayCalendarService;
use crate::services::slots::DailySlotStoreService;

fn map_schedule_error(e: ScheduleError) -> AppError {
    match &e {
        ScheduleError::Validation(msg) => AppError::ValidationError(msg.clone()),
        ScheduleError::WorkingDayNotFound(_)
        | ScheduleError::SlotSetNotFound(_)
        | ScheduleError::SlotNotFound => AppError::NotFound(e.to_string()),
        ScheduleError::DuplicateDate(_)
        | ScheduleError::SlotOverlap
        | ScheduleError::SlotNotAvailable
        | ScheduleError::SlotFull
        | ScheduleError::ConcurrencyConflict => AppError::Conflict(e.to_string()),
        ScheduleError::SlotHasBookings
        | ScheduleError::SetHasBookings
        | ScheduleError::NoActiveBookings => AppError::RuleViolation(e.to_string()),
        ScheduleError::Database(msg) => AppError::Database(msg.clone()),
    }
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin role required".to_string()));
    }
    Ok(())
}

// ==============================================================================
// WORKING DAY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_working_days(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = WorkingDayCalendarService::new(&state);
    let entries = service
        .get_all(Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "working_days": entries
    })))
}

#[axum::debug_handler]
pub async fn upsert_working_day(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(day_of_week): Path<u8>,
    Json(request): Json<UpsertWorkingDayRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = WorkingDayCalendarService::new(&state);
    let entry = service
        .upsert(day_of_week, request, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "working_day": entry
    })))
}

#[axum::debug_handler]
pub async fn bulk_update_working_days(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(updates): Json<Vec<BulkWorkingDayUpdate>>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = WorkingDayCalendarService::new(&state);
    let entries = service
        .bulk_update(updates, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "updated": entries.len(),
        "working_days": entries
    })))
}

#[axum::debug_handler]
pub async fn deactivate_working_day(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(day_of_week): Path<u8>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = WorkingDayCalendarService::new(&state);
    let entry = service
        .deactivate(day_of_week, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Working day deactivated",
        "working_day": entry
    })))
}

// ==============================================================================
// SLOT SET HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_slot_set(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotSetRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    for slot in &request.slots {
        slot.validate().map_err(map_schedule_error)?;
    }
    let slots = request.slots.into_iter().map(NewSlot::into_slot).collect();

    let service = DailySlotStoreService::new(&state);
    let set = service
        .create_for_date(request.date, slots, &user.id, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "slot_set": set
    })))
}

#[axum::debug_handler]
pub async fn get_slot_set(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, AppError> {
    let service = DailySlotStoreService::new(&state);
    let set = service
        .get_for_date(date, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "slot_set": set
    })))
}

#[axum::debug_handler]
pub async fn get_slot_sets(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DailySlotStoreService::new(&state);
    let sets = service
        .get_for_range(range.from, range.to, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "count": sets.len(),
        "slot_sets": sets
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, AppError> {
    let service = DailySlotStoreService::new(&state);
    let slots = service
        .get_available(date, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "date": date,
        "available_slots": slots
    })))
}

#[axum::debug_handler]
pub async fn update_slot_set(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(date): Path<NaiveDate>,
    Json(request): Json<UpdateSlotSetRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DailySlotStoreService::new(&state);
    let set = service
        .update_for_date(date, request.slots, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "slot_set": set
    })))
}

#[axum::debug_handler]
pub async fn add_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(date): Path<NaiveDate>,
    Json(request): Json<NewSlot>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DailySlotStoreService::new(&state);
    let set = service
        .add_slot(date, request, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "slot_set": set
    })))
}

#[axum::debug_handler]
pub async fn remove_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((date, slot_id)): Path<(NaiveDate, Uuid)>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DailySlotStoreService::new(&state);
    let set = service
        .remove_slot(date, slot_id, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "slot_set": set
    })))
}

#[axum::debug_handler]
pub async fn delete_slot_set(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = DailySlotStoreService::new(&state);
    service
        .delete_for_date(date, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Slot set for {} deleted", date)
    })))
}

#[axum::debug_handler]
pub async fn get_slot_statistics(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DailySlotStoreService::new(&state);
    let stats = service
        .statistics(range.from, range.to, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "statistics": stats
    })))
}
