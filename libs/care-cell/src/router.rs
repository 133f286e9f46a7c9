use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn health_record_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_health_records).post(handlers::create_health_record),
        )
        .layer(middleware::from_fn_with_state(state, auth_middleware))
}

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_appointments).post(handlers::book_appointment),
        )
        .layer(middleware::from_fn_with_state(state, auth_middleware))
}

pub fn telemedicine_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_sessions).post(handlers::create_session))
        .layer(middleware::from_fn_with_state(state, auth_middleware))
}
