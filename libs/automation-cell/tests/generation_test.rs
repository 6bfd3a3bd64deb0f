// libs/automation-cell/tests/generation_test.rs
//
// Generation-run tests with the persistent store stood in by wiremock.

use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use automation_cell::models::GenerationDefaults;
use automation_cell::services::generation::SlotAutomationService;
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

fn working_day_row(is_working: bool) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "day_of_week": 1,
        "is_working": is_working,
        "start_time": if is_working { Some("09:00") } else { None },
        "end_time": if is_working { Some("12:00") } else { None },
        "break_start": null,
        "break_end": null,
        "created_at": "2026-08-01T08:00:00Z",
        "updated_at": "2026-08-01T08:00:00Z"
    })
}

fn set_row(date: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "date": date,
        "slots": [],
        "version": 0,
        "created_by": "system",
        "created_at": "2026-08-01T08:00:00Z",
        "updated_at": "2026-08-01T08:00:00Z"
    })
}

#[tokio::test]
async fn rerun_over_generated_range_skips_every_date() {
    let server = MockServer::start().await;

    // Every date already has a slot set; the run must not write anything,
    // which the absent POST mock enforces.
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![set_row("2026-08-10")]))
        .mount(&server)
        .await;

    let service = SlotAutomationService::new(&test_config(&server.uri()));
    let from = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();

    let summary = service
        .ensure_range(from, 3, GenerationDefaults::default(), None)
        .await;

    assert_eq!(summary.generated, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.errored, 0);
}

#[tokio::test]
async fn missing_working_dates_are_generated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/working_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![working_day_row(true)]))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(vec![set_row("2026-08-10")]))
        .mount(&server)
        .await;

    let service = SlotAutomationService::new(&test_config(&server.uri()));
    let from = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();

    let summary = service
        .ensure_range(from, 2, GenerationDefaults::default(), None)
        .await;

    assert_eq!(summary.generated, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.errored, 0);
}

#[tokio::test]
async fn non_working_days_are_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/working_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![working_day_row(false)]))
        .mount(&server)
        .await;

    let service = SlotAutomationService::new(&test_config(&server.uri()));
    let from = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();

    let summary = service
        .ensure_range(from, 4, GenerationDefaults::default(), None)
        .await;

    assert_eq!(summary.generated, 0);
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.errored, 0);
}

#[tokio::test]
async fn losing_a_creation_race_counts_as_a_skip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/working_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![working_day_row(true)]))
        .mount(&server)
        .await;

    // First writer won between our existence check and the insert.
    Mock::given(method("POST"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key value"))
        .mount(&server)
        .await;

    let service = SlotAutomationService::new(&test_config(&server.uri()));
    let from = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();

    let summary = service
        .ensure_range(from, 1, GenerationDefaults::default(), None)
        .await;

    assert_eq!(summary.generated, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errored, 0);
}

#[tokio::test]
async fn store_failures_are_counted_not_propagated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let service = SlotAutomationService::new(&test_config(&server.uri()));
    let from = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();

    let summary = service
        .ensure_range(from, 3, GenerationDefaults::default(), None)
        .await;

    assert_eq!(summary.generated, 0);
    assert_eq!(summary.errored, 3);
    assert_eq!(summary.outcomes.len(), 3);
}

#[tokio::test]
async fn generation_status_reports_per_date_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![set_row("2026-08-10")]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/working_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![working_day_row(true)]))
        .mount(&server)
        .await;

    let service = SlotAutomationService::new(&test_config(&server.uri()));
    let from = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
    let to = NaiveDate::from_ymd_opt(2026, 8, 11).unwrap();

    let statuses = service.generation_status(from, to, None).await.unwrap();

    assert_eq!(statuses.len(), 2);
    assert!(statuses[0].slot_set_exists);
    assert!(!statuses[1].slot_set_exists);
}
