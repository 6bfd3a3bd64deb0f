// libs/settings-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Externally adjustable numeric threshold. Keys are free-form but the
/// booking flow reads the well-known ones below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSetting {
    pub id: Uuid,
    pub key: String,
    pub value: f64,
    pub description: Option<String>,
    pub is_active: bool,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const MINIMUM_ORDER_VALUE: &str = "MINIMUM_ORDER_VALUE";
pub const MAX_RESCHEDULE_COUNT: &str = "MAX_RESCHEDULE_COUNT";
pub const CANCELLATION_WINDOW_HOURS: &str = "CANCELLATION_WINDOW_HOURS";
pub const RESCHEDULE_WINDOW_HOURS: &str = "RESCHEDULE_WINDOW_HOURS";

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: f64,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Audit trail row written on every admin change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsAuditEntry {
    pub id: Uuid,
    pub key: String,
    pub old_value: Option<f64>,
    pub new_value: f64,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}
