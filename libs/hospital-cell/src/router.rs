use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_database::Database;

use crate::handlers;
use crate::services::TomTomClient;

pub struct HospitalState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub geosearch: Arc<TomTomClient>,
}

impl HospitalState {
    pub fn new(config: Arc<AppConfig>, db: Database) -> Self {
        let geosearch = Arc::new(TomTomClient::new(&config));
        Self {
            config,
            db,
            geosearch,
        }
    }
}

// Hospital lookup and reviews are public.
pub fn hospital_routes(state: Arc<HospitalState>) -> Router {
    Router::new()
        .route("/nearby", get(handlers::nearby_hospitals))
        .route("/database", get(handlers::stored_hospitals))
        .route("/{id}", get(handlers::get_hospital))
        .route("/{id}/review", post(handlers::add_review))
        .with_state(state)
}
