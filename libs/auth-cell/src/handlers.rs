use std::sync::Arc;

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        Extension, Form, Json, State,
    },
    http::StatusCode,
};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{LoginForm, ProfileResponse, RegisterRequest, UserResponse};
use crate::router::AuthState;
use crate::services::AccountService;

fn account_service(state: &AuthState) -> AccountService {
    AccountService::new(state.config.clone(), state.db.clone(), state.identity.clone())
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AuthState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let Json(request) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;
    debug!("Register request for {}", request.email);

    let response = account_service(&state).register(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AuthState>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Form(form) = form.map_err(|e| AppError::ValidationError(e.body_text()))?;
    debug!("Login request for {}", form.username);

    let response = account_service(&state).login(form).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AuthState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ProfileResponse>, AppError> {
    debug!("Getting profile for user: {}", user.uid);

    let profile = account_service(&state).profile(&user).await?;

    Ok(Json(profile))
}
