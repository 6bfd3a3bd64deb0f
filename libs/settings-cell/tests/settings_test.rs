// libs/settings-cell/tests/settings_test.rs
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use settings_cell::models::UpdateSettingRequest;
use settings_cell::services::settings::BookingSettingsService;
use shared_config::AppConfig;

fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        store_url: base_url.to_string(),
        store_anon_key: "test-key".to_string(),
        store_jwt_secret: "test-secret".to_string(),
        razorpay_key_id: String::new(),
        razorpay_key_secret: String::new(),
        support_contact: "support@velora.in".to_string(),
        settings_cache_ttl_seconds: 300,
    }
}

fn setting_row(key: &str, value: f64, is_active: bool) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "key": key,
        "value": value,
        "description": "test threshold",
        "is_active": is_active,
        "updated_by": "admin-1",
        "created_at": "2026-08-01T08:00:00Z",
        "updated_at": "2026-08-01T08:00:00Z"
    })
}

#[tokio::test]
async fn numeric_reads_are_served_from_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/booking_settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![setting_row("CANCELLATION_WINDOW_HOURS", 2.0, true)]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = BookingSettingsService::new(&test_config(&server.uri()));

    assert_eq!(service.get_numeric("CANCELLATION_WINDOW_HOURS", None).await, Some(2.0));
    // Second read must not touch the store; the expect(1) above enforces it.
    assert_eq!(service.get_numeric("CANCELLATION_WINDOW_HOURS", None).await, Some(2.0));
}

#[tokio::test]
async fn zero_ttl_always_refetches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/booking_settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![setting_row("RESCHEDULE_WINDOW_HOURS", 4.0, true)]),
        )
        .expect(2)
        .mount(&server)
        .await;

    let service =
        BookingSettingsService::with_ttl(&test_config(&server.uri()), Duration::from_secs(0));

    assert_eq!(service.get_numeric("RESCHEDULE_WINDOW_HOURS", None).await, Some(4.0));
    assert_eq!(service.get_numeric("RESCHEDULE_WINDOW_HOURS", None).await, Some(4.0));
}

#[tokio::test]
async fn store_failure_fails_open() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/booking_settings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let service = BookingSettingsService::new(&test_config(&server.uri()));

    assert_eq!(service.get_numeric("MINIMUM_ORDER_VALUE", None).await, None);
}

#[tokio::test]
async fn inactive_setting_is_not_enforced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/booking_settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![setting_row("MINIMUM_ORDER_VALUE", 500.0, false)]),
        )
        .mount(&server)
        .await;

    let service = BookingSettingsService::new(&test_config(&server.uri()));

    assert_eq!(service.get_numeric("MINIMUM_ORDER_VALUE", None).await, None);
}

#[tokio::test]
async fn invalidation_forces_a_refetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/booking_settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![setting_row("MAX_RESCHEDULE_COUNT", 3.0, true)]),
        )
        .expect(2)
        .mount(&server)
        .await;

    let service = BookingSettingsService::new(&test_config(&server.uri()));

    assert_eq!(service.get_numeric("MAX_RESCHEDULE_COUNT", None).await, Some(3.0));
    service.invalidate("MAX_RESCHEDULE_COUNT").await;
    assert_eq!(service.get_numeric("MAX_RESCHEDULE_COUNT", None).await, Some(3.0));
}

#[tokio::test]
async fn update_persists_and_audits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/booking_settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![setting_row("CANCELLATION_WINDOW_HOURS", 2.0, true)]),
        )
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/booking_settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![setting_row("CANCELLATION_WINDOW_HOURS", 6.0, true)]),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/booking_settings_audit"))
        .respond_with(ResponseTemplate::new(201).set_body_json(vec![json!({
            "id": Uuid::new_v4(),
            "key": "CANCELLATION_WINDOW_HOURS",
            "old_value": 2.0,
            "new_value": 6.0,
            "changed_by": "admin-1",
            "changed_at": "2026-08-01T08:00:00Z"
        })]))
        .expect(1)
        .mount(&server)
        .await;

    let service = BookingSettingsService::new(&test_config(&server.uri()));
    let updated = service
        .update(
            "CANCELLATION_WINDOW_HOURS",
            UpdateSettingRequest {
                value: 6.0,
                description: None,
                is_active: None,
            },
            "admin-1",
            None,
        )
        .await
        .unwrap();

    assert_eq!(updated.value, 6.0);
}
