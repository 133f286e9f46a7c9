use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_database::Database;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::IdentityProvider;

pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AuthState {
    pub fn new(config: Arc<AppConfig>, db: Database, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config,
            db,
            identity,
        }
    }
}

pub fn auth_routes(state: Arc<AuthState>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let protected_routes = Router::new()
        .route("/me", get(handlers::me))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
