use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Directory endpoints are public; availability requires authentication
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/filter", get(handlers::filter_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor));

    let protected_routes = Router::new()
        .route("/{doctor_id}/slots", get(handlers::get_day_slots))
        .route("/{doctor_id}/availability", get(handlers::get_month_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
