// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_booking))
        .route("/search", get(handlers::search_bookings))
        .route("/upcoming", get(handlers::get_upcoming_bookings))
        .route("/stats", get(handlers::get_booking_stats))
        .route("/analytics", get(handlers::get_booking_analytics))
        .route("/user/{user_id}", get(handlers::list_user_bookings))
        .route("/{booking_id}", get(handlers::get_booking))
        .route("/{booking_id}/status", patch(handlers::update_booking_status))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/{booking_id}/reschedule", patch(handlers::reschedule_booking))
        .route("/{booking_id}/payment", post(handlers::complete_payment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
