// libs/settings-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::error::SettingsError;
use crate::models::UpdateSettingRequest;
use crate::services::settings::BookingSettingsService;

fn map_settings_error(e: SettingsError) -> AppError {
    match e {
        SettingsError::Validation(msg) => AppError::ValidationError(msg),
        SettingsError::NotFound(key) => AppError::NotFound(format!("Setting not found: {}", key)),
        SettingsError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin role required".to_string()));
    }

    let service = BookingSettingsService::new(&state);
    let settings = service
        .get_all(Some(auth.token()))
        .await
        .map_err(map_settings_error)?;

    Ok(Json(json!({
        "success": true,
        "settings": settings
    })))
}

#[axum::debug_handler]
pub async fn get_setting(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(key): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin role required".to_string()));
    }

    let service = BookingSettingsService::new(&state);
    let setting = service
        .get(&key, Some(auth.token()))
        .await
        .map_err(map_settings_error)?;

    Ok(Json(json!({
        "success": true,
        "setting": setting
    })))
}

#[axum::debug_handler]
pub async fn update_setting(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(key): Path<String>,
    Json(request): Json<UpdateSettingRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin role required".to_string()));
    }

    let service = BookingSettingsService::new(&state);
    let setting = service
        .update(&key, request, &user.id, Some(auth.token()))
        .await
        .map_err(map_settings_error)?;

    Ok(Json(json!({
        "success": true,
        "setting": setting
    })))
}
