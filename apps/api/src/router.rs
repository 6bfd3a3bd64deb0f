use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use automation_cell::router::automation_routes;
use booking_cell::router::booking_routes;
use scheduling_cell::router::{slot_routes, working_day_routes};
use settings_cell::router::settings_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Velora booking API is running!" }))
        .nest("/working-days", working_day_routes(state.clone()))
        .nest("/slots", slot_routes(state.clone()))
        .nest("/automation", automation_routes(state.clone()))
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/settings", settings_routes(state.clone()))
}
