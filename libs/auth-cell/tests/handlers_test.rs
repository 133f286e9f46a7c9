use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Extension, Form, Json, State},
    http::StatusCode,
};

use auth_cell::handlers::{login, me, register};
use auth_cell::models::{LoginForm, RegisterRequest};
use auth_cell::services::firebase::{NewAccount, ProviderUser};
use auth_cell::services::{IdentityError, IdentityProvider};
use auth_cell::AuthState;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestDatabase, TestUser};

/// In-memory identity provider keyed by email.
#[derive(Default)]
struct StubIdentity {
    accounts: Mutex<Vec<(ProviderUser, String)>>,
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn create_user(&self, account: &NewAccount) -> Result<ProviderUser, IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|(u, _)| u.email == account.email) {
            return Err(IdentityError::AlreadyExists);
        }
        let user = ProviderUser {
            uid: format!("uid-{}", accounts.len() + 1),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            disabled: false,
        };
        accounts.push((user.clone(), account.password.clone()));
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<ProviderUser, IdentityError> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone())
            .ok_or(IdentityError::NotFound)
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<(), IdentityError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.iter().find(|(u, _)| u.email == email) {
            Some((_, stored)) if stored == password => Ok(()),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError> {
        self.accounts.lock().unwrap().retain(|(u, _)| u.uid != uid);
        Ok(())
    }
}

fn create_state(test_db: &TestDatabase) -> Arc<AuthState> {
    Arc::new(AuthState::new(
        TestConfig::default().to_arc(),
        test_db.db.clone(),
        Arc::new(StubIdentity::default()),
    ))
}

fn register_request(email: &str, role: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "secure123".to_string(),
        full_name: Some("Jane Doe".to_string()),
        role: role.map(str::to_string),
    }
}

#[tokio::test]
async fn test_register_handler_returns_created() {
    let test_db = TestDatabase::new();
    let state = create_state(&test_db);

    let (status, Json(body)) = register(
        State(state),
        Ok(Json(register_request("jane@example.com", Some("doctor")))),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.email, "jane@example.com");
    assert_eq!(body.full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(body.role, "doctor");
    assert_eq!(body.token_type, "bearer");
    assert!(!body.token.is_empty());
}

#[tokio::test]
async fn test_register_handler_normalizes_email() {
    let test_db = TestDatabase::new();
    let state = create_state(&test_db);

    let (_, Json(body)) = register(
        State(state),
        Ok(Json(register_request("  Jane@Example.COM ", None))),
    )
    .await
    .unwrap();

    assert_eq!(body.email, "jane@example.com");
    assert_eq!(body.role, "outsider");
}

#[tokio::test]
async fn test_register_handler_duplicate_email() {
    let test_db = TestDatabase::new();
    let state = create_state(&test_db);

    register(
        State(state.clone()),
        Ok(Json(register_request("jane@example.com", None))),
    )
    .await
    .unwrap();

    let result = register(
        State(state),
        Ok(Json(register_request("jane@example.com", None))),
    )
    .await;

    match result.unwrap_err() {
        AppError::BadRequest(msg) => assert_eq!(msg, "Email already exists."),
        other => panic!("Expected BadRequest error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_login_handler() {
    let test_db = TestDatabase::new();
    let state = create_state(&test_db);

    register(
        State(state.clone()),
        Ok(Json(register_request("jane@example.com", Some("doctor")))),
    )
    .await
    .unwrap();

    let Json(body) = login(
        State(state.clone()),
        Ok(Form(LoginForm {
            username: "jane@example.com".to_string(),
            password: "secure123".to_string(),
        })),
    )
    .await
    .unwrap();
    assert_eq!(body.role, "doctor");

    let result = login(
        State(state),
        Ok(Form(LoginForm {
            username: "jane@example.com".to_string(),
            password: "not-the-password".to_string(),
        })),
    )
    .await;

    match result.unwrap_err() {
        AppError::Auth(msg) => assert_eq!(msg, "Invalid email or password."),
        other => panic!("Expected Auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_me_handler() {
    let test_db = TestDatabase::new();
    let state = create_state(&test_db);

    let (_, Json(registered)) = register(
        State(state.clone()),
        Ok(Json(register_request("jane@example.com", None))),
    )
    .await
    .unwrap();

    let caller = shared_utils::jwt::validate_token(&registered.token, &state.config).unwrap();
    let Json(profile) = me(State(state), Extension(caller)).await.unwrap();

    assert_eq!(profile.email, "jane@example.com");
    assert_eq!(profile.full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(profile.role, "outsider");
    assert!(profile.is_active);
}

#[tokio::test]
async fn test_me_handler_unknown_user() {
    let test_db = TestDatabase::new();
    let state = create_state(&test_db);

    let result = me(State(state), Extension(TestUser::default().to_user())).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}
