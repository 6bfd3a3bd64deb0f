// libs/automation-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn automation_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/run", post(handlers::trigger_daily_run))
        .route("/run-weekly", post(handlers::trigger_weekly_run))
        .route("/bulk", post(handlers::bulk_generate))
        .route("/dates/{date}", post(handlers::generate_for_date))
        .route("/status", get(handlers::generation_status))
        .route("/summary", get(handlers::generation_summary))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
