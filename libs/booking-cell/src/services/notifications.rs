// libs/booking-cell/src/services/notifications.rs
use std::fmt;

use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::Booking;

#[derive(Debug, Clone, Copy)]
pub enum NotificationEvent {
    BookingCreated,
    BookingCancelled,
    BookingRescheduled,
    PaymentCompleted,
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationEvent::BookingCreated => write!(f, "booking_created"),
            NotificationEvent::BookingCancelled => write!(f, "booking_cancelled"),
            NotificationEvent::BookingRescheduled => write!(f, "booking_rescheduled"),
            NotificationEvent::PaymentCompleted => write!(f, "payment_completed"),
        }
    }
}

/// Fire-and-forget hook after lifecycle transitions. The insert runs on a
/// spawned task; a failed delivery is logged and never reaches the caller,
/// so a flaky notification pipeline cannot fail a booking.
pub struct NotificationService {
    config: AppConfig,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn dispatch(&self, event: NotificationEvent, booking: &Booking) {
        let config = self.config.clone();
        let payload = json!({
            "id": Uuid::new_v4(),
            "event": event.to_string(),
            "booking_id": booking.id,
            "order_number": booking.order_number,
            "user_id": booking.user_id,
            "booking_date": booking.booking_details.date,
            "booking_slot": booking.booking_details.slot,
            "created_at": chrono::Utc::now().to_rfc3339(),
        });

        tokio::spawn(async move {
            let store = StoreClient::new(&config);
            match store.insert_returning("notifications", None, payload).await {
                Ok(_) => debug!("Notification {} queued", event),
                Err(e) => warn!("Notification {} dropped: {}", event, e),
            }
        });
    }
}
