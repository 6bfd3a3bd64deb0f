// libs/settings-cell/src/services/settings.rs
use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::error::SettingsError;
use crate::models::{BookingSetting, UpdateSettingRequest};

struct CachedValue {
    value: Option<f64>,
    cached_at: Instant,
}

/// Threshold lookups with an explicit in-process cache.
///
/// The TTL is part of the constructor contract and every admin write goes
/// through `update`, which invalidates the touched key. Reads fail open: a
/// store error or an inactive row yields `None`, and callers skip the
/// corresponding validation instead of blocking the booking.
pub struct BookingSettingsService {
    store: StoreClient,
    cache: RwLock<HashMap<String, CachedValue>>,
    ttl: Duration,
}

impl BookingSettingsService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_ttl(config, Duration::from_secs(config.settings_cache_ttl_seconds))
    }

    pub fn with_ttl(config: &AppConfig, ttl: Duration) -> Self {
        Self {
            store: StoreClient::new(config),
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached numeric read. `None` means "no enforceable value": missing
    /// row, inactive row, or a store failure (fail open).
    pub async fn get_numeric(&self, key: &str, auth_token: Option<&str>) -> Option<f64> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(key) {
                if entry.cached_at.elapsed() < self.ttl {
                    return entry.value;
                }
            }
        }

        let value = match self.fetch(key, auth_token).await {
            Ok(Some(setting)) if setting.is_active => Some(setting.value),
            Ok(_) => None,
            Err(e) => {
                warn!("Settings lookup for {} failed, failing open: {}", key, e);
                return None;
            }
        };

        let mut cache = self.cache.write().await;
        cache.insert(
            key.to_string(),
            CachedValue {
                value,
                cached_at: Instant::now(),
            },
        );

        value
    }

    pub async fn get_all(&self, auth_token: Option<&str>) -> Result<Vec<BookingSetting>, SettingsError> {
        let result: Vec<Value> = self
            .store
            .request(
                Method::GET,
                "/rest/v1/booking_settings?order=key.asc",
                auth_token,
                None,
            )
            .await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| SettingsError::Database(e.to_string())))
            .collect()
    }

    pub async fn get(&self, key: &str, auth_token: Option<&str>) -> Result<BookingSetting, SettingsError> {
        self.fetch(key, auth_token)
            .await?
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))
    }

    /// Persist a new value, append an audit row, then drop the cached entry
    /// so the next read observes the change.
    pub async fn update(
        &self,
        key: &str,
        request: UpdateSettingRequest,
        changed_by: &str,
        auth_token: Option<&str>,
    ) -> Result<BookingSetting, SettingsError> {
        if key.trim().is_empty() {
            return Err(SettingsError::Validation("Setting key must not be empty".to_string()));
        }

        let existing = self.fetch(key, auth_token).await?;
        let old_value = existing.as_ref().map(|s| s.value);

        let rows = match &existing {
            Some(setting) => {
                let filter = format!("id=eq.{}", setting.id);
                self.store
                    .update_where(
                        "booking_settings",
                        &filter,
                        auth_token,
                        json!({
                            "value": request.value,
                            "description": request.description.clone().or(setting.description.clone()),
                            "is_active": request.is_active.unwrap_or(setting.is_active),
                            "updated_by": changed_by,
                            "updated_at": chrono::Utc::now().to_rfc3339(),
                        }),
                    )
                    .await?
            }
            None => {
                self.store
                    .insert_returning(
                        "booking_settings",
                        auth_token,
                        json!({
                            "id": Uuid::new_v4(),
                            "key": key,
                            "value": request.value,
                            "description": request.description,
                            "is_active": request.is_active.unwrap_or(true),
                            "updated_by": changed_by,
                            "created_at": chrono::Utc::now().to_rfc3339(),
                            "updated_at": chrono::Utc::now().to_rfc3339(),
                        }),
                    )
                    .await?
            }
        };

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SettingsError::Database("Setting write returned no row".to_string()))?;
        let setting: BookingSetting =
            serde_json::from_value(row).map_err(|e| SettingsError::Database(e.to_string()))?;

        self.write_audit(key, old_value, request.value, changed_by, auth_token)
            .await;

        self.invalidate(key).await;
        info!("Setting {} updated to {} by {}", key, request.value, changed_by);

        Ok(setting)
    }

    pub async fn invalidate(&self, key: &str) {
        let mut cache = self.cache.write().await;
        if cache.remove(key).is_some() {
            debug!("Invalidated cached setting {}", key);
        }
    }

    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
        debug!("Invalidated all cached settings");
    }

    async fn fetch(
        &self,
        key: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<BookingSetting>, SettingsError> {
        let path = format!("/rest/v1/booking_settings?key=eq.{}", key);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, auth_token, None)
            .await?;

        match result.into_iter().next() {
            Some(row) => {
                let setting = serde_json::from_value(row)
                    .map_err(|e| SettingsError::Database(e.to_string()))?;
                Ok(Some(setting))
            }
            None => Ok(None),
        }
    }

    /// Audit failures are logged, never surfaced; the setting change itself
    /// has already committed.
    async fn write_audit(
        &self,
        key: &str,
        old_value: Option<f64>,
        new_value: f64,
        changed_by: &str,
        auth_token: Option<&str>,
    ) {
        let result = self
            .store
            .insert_returning(
                "booking_settings_audit",
                auth_token,
                json!({
                    "id": Uuid::new_v4(),
                    "key": key,
                    "old_value": old_value,
                    "new_value": new_value,
                    "changed_by": changed_by,
                    "changed_at": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await;

        if let Err(e) = result {
            warn!("Failed to write settings audit row for {}: {}", key, e);
        }
    }
}
