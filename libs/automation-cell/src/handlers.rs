// libs/automation-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use scheduling_cell::error::ScheduleError;

use crate::models::{BulkGenerateRequest, GenerationDefaults, StatusRangeQuery};
use crate::services::generation::SlotAutomationService;

fn map_schedule_error(e: ScheduleError) -> AppError {
    match e {
        ScheduleError::Validation(msg) => AppError::ValidationError(msg),
        ScheduleError::Database(msg) => AppError::Database(msg),
        other => AppError::Internal(other.to_string()),
    }
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin role required".to_string()));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn trigger_daily_run(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = SlotAutomationService::new(&state);
    let summary = service.run_daily(Some(auth.token())).await;

    Ok(Json(json!({
        "success": true,
        "summary": summary
    })))
}

#[axum::debug_handler]
pub async fn trigger_weekly_run(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = SlotAutomationService::new(&state);
    let summary = service.run_weekly(Some(auth.token())).await;

    Ok(Json(json!({
        "success": true,
        "summary": summary
    })))
}

#[axum::debug_handler]
pub async fn bulk_generate(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BulkGenerateRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    if request.days == 0 || request.days > 365 {
        return Err(AppError::ValidationError(
            "days must be between 1 and 365".to_string(),
        ));
    }

    let mut defaults = GenerationDefaults::default();
    if let Some(duration) = request.slot_duration_minutes {
        defaults.slot_duration_minutes = duration;
    }
    if let Some(max) = request.max_bookings {
        defaults.max_bookings = max;
    }

    let service = SlotAutomationService::new(&state);
    let summary = service
        .ensure_range(request.from, request.days, defaults, Some(auth.token()))
        .await;

    Ok(Json(json!({
        "success": true,
        "summary": summary
    })))
}

#[axum::debug_handler]
pub async fn generate_for_date(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let service = SlotAutomationService::new(&state);
    let summary = service
        .generate_for_date(date, GenerationDefaults::default(), Some(auth.token()))
        .await;

    Ok(Json(json!({
        "success": true,
        "summary": summary
    })))
}

#[axum::debug_handler]
pub async fn generation_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(range): Query<StatusRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SlotAutomationService::new(&state);
    let statuses = service
        .generation_status(range.from, range.to, Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "dates": statuses
    })))
}

#[axum::debug_handler]
pub async fn generation_summary(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = SlotAutomationService::new(&state);
    let window = service
        .generation_summary(Some(auth.token()))
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "success": true,
        "window": window
    })))
}
