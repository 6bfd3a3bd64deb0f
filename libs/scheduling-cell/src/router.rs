// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn working_day_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::get_working_days))
        .route("/", put(handlers::bulk_update_working_days))
        .route("/{day_of_week}", put(handlers::upsert_working_day))
        .route("/{day_of_week}", delete(handlers::deactivate_working_day))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn slot_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_slot_set))
        .route("/", get(handlers::get_slot_sets))
        .route("/statistics", get(handlers::get_slot_statistics))
        .route("/{date}", get(handlers::get_slot_set))
        .route("/{date}", put(handlers::update_slot_set))
        .route("/{date}", delete(handlers::delete_slot_set))
        .route("/{date}/available", get(handlers::get_available_slots))
        .route("/{date}/slots", post(handlers::add_slot))
        .route("/{date}/slots/{slot_id}", delete(handlers::remove_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
