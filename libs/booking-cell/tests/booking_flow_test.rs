// libs/booking-cell/tests/booking_flow_test.rs
//
// Booking lifecycle tests against a wiremock stand-in for the store.
// Pure window arithmetic is covered by the lifecycle unit tests; these
// exercise the store-facing flows.

use assert_matches::assert_matches;
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::error::BookingError;
use booking_cell::models::{
    ActingRole, BookingStatus, CancelBookingRequest, CompletePaymentRequest,
    CreateBookingRequest, PaymentMethod, PaymentStatus, RescheduleBookingRequest,
};
use booking_cell::services::booking::BookingService;
use shared_config::AppConfig;

fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        store_url: base_url.to_string(),
        store_anon_key: "test-key".to_string(),
        store_jwt_secret: "test-secret".to_string(),
        razorpay_key_id: "rzp_test_key".to_string(),
        razorpay_key_secret: "gateway-secret".to_string(),
        support_contact: "support@velora.in".to_string(),
        settings_cache_ttl_seconds: 300,
    }
}

fn booking_row(
    id: Uuid,
    date: &str,
    slot: &str,
    status: &str,
    payment_status: &str,
    reschedule_count: u32,
) -> Value {
    json!({
        "id": id,
        "order_number": "BOOK-2026-1754400000000-0042",
        "user_id": "user-1",
        "status": status,
        "payment_status": payment_status,
        "payment_method": null,
        "total_amount": 1500.0,
        "booking_details": {
            "date": date,
            "slot": slot,
            "duration_minutes": 45,
            "address": "12 Rose Street"
        },
        "rescheduling_details": {
            "original_date": null,
            "original_slot": null,
            "rescheduled_at": null,
            "rescheduled_by": null,
            "reschedule_reason": null,
            "reschedule_count": reschedule_count
        },
        "cancellation_details": null,
        "slot_tracked": false,
        "paid_at": null,
        "created_at": "2026-08-01T08:00:00Z",
        "updated_at": "2026-08-01T08:00:00Z"
    })
}

async fn mount_empty_settings(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/booking_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Value>::new()))
        .mount(server)
        .await;
}

async fn mount_booking(server: &MockServer, id: Uuid, row: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![row]))
        .mount(server)
        .await;
}

#[tokio::test]
async fn fourth_reschedule_fails_even_far_in_advance() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_empty_settings(&server).await;
    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "confirmed", "pending", 3),
    )
    .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let request = RescheduleBookingRequest {
        new_date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
        new_slot: "11:00 AM".to_string(),
        new_payment_method: None,
        reason: None,
    };

    let result = service
        .reschedule(id, request, ActingRole::Customer, None)
        .await;
    assert_matches!(result, Err(BookingError::MaxReschedulesReached { max: 3 }));
}

#[tokio::test]
async fn reschedule_into_an_occupied_label_is_rejected() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_empty_settings(&server).await;
    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "confirmed", "pending", 0),
    )
    .await;

    // Another active booking already has the target date + label.
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("status", "in.(pending,confirmed,in_progress)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![booking_row(
            Uuid::new_v4(),
            "2030-02-01",
            "11:00 AM",
            "confirmed",
            "pending",
            0,
        )]))
        .mount(&server)
        .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let request = RescheduleBookingRequest {
        new_date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
        new_slot: "11:00 AM".to_string(),
        new_payment_method: None,
        reason: None,
    };

    let result = service
        .reschedule(id, request, ActingRole::Customer, None)
        .await;
    assert_matches!(result, Err(BookingError::SlotTaken));
}

#[tokio::test]
async fn first_reschedule_snapshots_the_original_schedule() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_empty_settings(&server).await;
    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "confirmed", "pending", 0),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("status", "in.(pending,confirmed,in_progress)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<Value>::new()))
        .mount(&server)
        .await;

    let mut updated = booking_row(id, "2030-02-01", "11:00 AM", "confirmed", "pending", 1);
    updated["rescheduling_details"] = json!({
        "original_date": "2030-01-01",
        "original_slot": "10:00 AM",
        "rescheduled_at": "2026-08-06T09:00:00Z",
        "rescheduled_by": "customer",
        "reschedule_reason": "moved house",
        "reschedule_count": 1
    });
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![updated]))
        .mount(&server)
        .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let request = RescheduleBookingRequest {
        new_date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
        new_slot: "11:00 AM".to_string(),
        new_payment_method: None,
        reason: Some("moved house".to_string()),
    };

    let booking = service
        .reschedule(id, request, ActingRole::Customer, None)
        .await
        .unwrap();

    assert_eq!(booking.rescheduling_details.reschedule_count, 1);
    assert_eq!(
        booking.rescheduling_details.original_slot.as_deref(),
        Some("10:00 AM")
    );
    assert_eq!(booking.booking_details.slot, "11:00 AM");
}

#[tokio::test]
async fn cancelling_a_past_booking_is_rejected() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_empty_settings(&server).await;
    mount_booking(
        &server,
        id,
        booking_row(id, "2020-01-01", "10:00 AM", "confirmed", "pending", 0),
    )
    .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let result = service
        .cancel(
            id,
            CancelBookingRequest {
                reason: "changed my mind".to_string(),
            },
            ActingRole::Customer,
            None,
        )
        .await;

    assert_matches!(result, Err(BookingError::CancellationWindowClosed { window_hours }) if window_hours == 2.0);
}

#[tokio::test]
async fn cancelling_a_cancelled_booking_reports_the_terminal_state() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_empty_settings(&server).await;
    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "cancelled", "pending", 0),
    )
    .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let result = service
        .cancel(
            id,
            CancelBookingRequest {
                reason: "again".to_string(),
            },
            ActingRole::Customer,
            None,
        )
        .await;

    assert_matches!(
        result,
        Err(BookingError::AlreadyTerminal(BookingStatus::Cancelled))
    );
}

#[tokio::test]
async fn cancel_inside_the_window_records_details() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_empty_settings(&server).await;
    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "confirmed", "completed", 0),
    )
    .await;

    let mut cancelled = booking_row(id, "2030-01-01", "10:00 AM", "cancelled", "completed", 0);
    cancelled["cancellation_details"] = json!({
        "cancelled_at": "2026-08-06T09:00:00Z",
        "cancelled_by": "customer",
        "cancellation_reason": "changed my mind",
        "refund_eligible": true
    });
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![cancelled]))
        .mount(&server)
        .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let booking = service
        .cancel(
            id,
            CancelBookingRequest {
                reason: "changed my mind".to_string(),
            },
            ActingRole::Customer,
            None,
        )
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Cancelled);
    let details = booking.cancellation_details.unwrap();
    assert!(details.refund_eligible);
}

#[tokio::test]
async fn paying_twice_is_rejected() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "confirmed", "completed", 0),
    )
    .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let result = service
        .complete_payment(
            id,
            CompletePaymentRequest {
                payment_method: PaymentMethod::Online,
                razorpay_order_id: Some("order_1".to_string()),
                razorpay_payment_id: Some("pay_1".to_string()),
                razorpay_signature: Some("00".to_string()),
            },
            None,
        )
        .await;

    assert_matches!(result, Err(BookingError::AlreadyPaid));
}

#[tokio::test]
async fn online_payment_requires_all_gateway_fields() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "pending", "pending", 0),
    )
    .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let result = service
        .complete_payment(
            id,
            CompletePaymentRequest {
                payment_method: PaymentMethod::Online,
                razorpay_order_id: Some("order_1".to_string()),
                razorpay_payment_id: None,
                razorpay_signature: None,
            },
            None,
        )
        .await;

    assert_matches!(result, Err(BookingError::IncompletePaymentData));
}

#[tokio::test]
async fn a_bad_signature_never_marks_the_booking_paid() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "pending", "pending", 0),
    )
    .await;

    // No PATCH mock: a write would fail loudly.
    let service = BookingService::new(&test_config(&server.uri()));
    let result = service
        .complete_payment(
            id,
            CompletePaymentRequest {
                payment_method: PaymentMethod::Online,
                razorpay_order_id: Some("order_1".to_string()),
                razorpay_payment_id: Some("pay_1".to_string()),
                razorpay_signature: Some(hex::encode([0u8; 32])),
            },
            None,
        )
        .await;

    assert_matches!(result, Err(BookingError::InvalidPaymentSignature));
}

#[tokio::test]
async fn verified_payment_promotes_a_pending_booking() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "pending", "pending", 0),
    )
    .await;

    let mut paid = booking_row(id, "2030-01-01", "10:00 AM", "confirmed", "completed", 0);
    paid["payment_method"] = json!("online");
    paid["paid_at"] = json!("2026-08-06T09:00:00Z");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![paid]))
        .mount(&server)
        .await;

    let mut mac = Hmac::<Sha256>::new_from_slice(b"gateway-secret").unwrap();
    mac.update(b"order_1|pay_1");
    let signature = hex::encode(mac.finalize().into_bytes());

    let service = BookingService::new(&test_config(&server.uri()));
    let booking = service
        .complete_payment(
            id,
            CompletePaymentRequest {
                payment_method: PaymentMethod::Online,
                razorpay_order_id: Some("order_1".to_string()),
                razorpay_payment_id: Some("pay_1".to_string()),
                razorpay_signature: Some(signature),
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn cod_leaves_payment_pending() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    mount_booking(
        &server,
        id,
        booking_row(id, "2030-01-01", "10:00 AM", "pending", "pending", 0),
    )
    .await;

    let mut cod = booking_row(id, "2030-01-01", "10:00 AM", "pending", "pending", 0);
    cod["payment_method"] = json!("cod");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![cod]))
        .mount(&server)
        .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let booking = service
        .complete_payment(
            id,
            CompletePaymentRequest {
                payment_method: PaymentMethod::Cod,
                razorpay_order_id: None,
                razorpay_payment_id: None,
                razorpay_signature: None,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.payment_method, Some(PaymentMethod::Cod));
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[tokio::test]
async fn create_below_the_minimum_order_value_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/booking_settings"))
        .and(query_param("key", "eq.MINIMUM_ORDER_VALUE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({
            "id": Uuid::new_v4(),
            "key": "MINIMUM_ORDER_VALUE",
            "value": 500.0,
            "description": null,
            "is_active": true,
            "updated_by": null,
            "created_at": "2026-08-01T08:00:00Z",
            "updated_at": "2026-08-01T08:00:00Z"
        })]))
        .mount(&server)
        .await;
    mount_empty_settings(&server).await;

    let service = BookingService::new(&test_config(&server.uri()));
    let result = service
        .create(
            "user-1",
            CreateBookingRequest {
                date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                slot: "10:00 AM".to_string(),
                duration_minutes: 45,
                address: Some("12 Rose Street".to_string()),
                total_amount: 300.0,
                payment_method: None,
            },
            None,
        )
        .await;

    assert_matches!(
        result,
        Err(BookingError::BelowMinimumOrderValue { minimum }) if minimum == 500.0
    );
}

#[tokio::test]
async fn create_takes_a_counter_on_the_matching_managed_slot() {
    let server = MockServer::start().await;
    let set_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();

    mount_empty_settings(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({
            "id": set_id,
            "date": "2030-01-01",
            "slots": [{
                "id": slot_id,
                "start_time": "10:00",
                "end_time": "11:00",
                "max_bookings": 5,
                "current_bookings": 0,
                "is_available": true
            }],
            "version": 0,
            "created_by": "system",
            "created_at": "2026-08-01T08:00:00Z",
            "updated_at": "2026-08-01T08:00:00Z"
        })]))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({
            "id": set_id,
            "date": "2030-01-01",
            "slots": [{
                "id": slot_id,
                "start_time": "10:00",
                "end_time": "11:00",
                "max_bookings": 5,
                "current_bookings": 1,
                "is_available": true
            }],
            "version": 1,
            "created_by": "system",
            "created_at": "2026-08-01T08:00:00Z",
            "updated_at": "2026-08-01T08:00:00Z"
        })]))
        .expect(1)
        .mount(&server)
        .await;

    let mut created = booking_row(
        Uuid::new_v4(),
        "2030-01-01",
        "10:00 AM",
        "pending",
        "pending",
        0,
    );
    created["slot_tracked"] = json!(true);
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(vec![created]))
        .mount(&server)
        .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let booking = service
        .create(
            "user-1",
            CreateBookingRequest {
                date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                slot: "10:00 AM".to_string(),
                duration_minutes: 45,
                address: None,
                total_amount: 1500.0,
                payment_method: None,
            },
            None,
        )
        .await
        .unwrap();

    assert!(booking.slot_tracked);
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[tokio::test]
async fn create_on_a_full_managed_slot_is_rejected() {
    let server = MockServer::start().await;

    mount_empty_settings(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_slot_sets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({
            "id": Uuid::new_v4(),
            "date": "2030-01-01",
            "slots": [{
                "id": Uuid::new_v4(),
                "start_time": "10:00",
                "end_time": "11:00",
                "max_bookings": 1,
                "current_bookings": 1,
                "is_available": true
            }],
            "version": 0,
            "created_by": "system",
            "created_at": "2026-08-01T08:00:00Z",
            "updated_at": "2026-08-01T08:00:00Z"
        })]))
        .mount(&server)
        .await;

    let service = BookingService::new(&test_config(&server.uri()));
    let result = service
        .create(
            "user-1",
            CreateBookingRequest {
                date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                slot: "10:00 AM".to_string(),
                duration_minutes: 45,
                address: None,
                total_amount: 1500.0,
                payment_method: None,
            },
            None,
        )
        .await;

    assert_matches!(
        result,
        Err(BookingError::Slot(scheduling_cell::error::ScheduleError::SlotFull))
    );
}
