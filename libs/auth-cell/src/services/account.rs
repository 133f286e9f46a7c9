use std::sync::Arc;

use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::users::{self, CreateUser};
use shared_database::{Database, DbError};
use shared_models::auth::{User, DEFAULT_ROLE};
use shared_utils::jwt::create_access_token;

use crate::models::{
    AuthError, LoginForm, ProfileResponse, RegisterRequest, UserResponse, MIN_PASSWORD_LENGTH,
};
use crate::services::firebase::{IdentityError, IdentityProvider, NewAccount};

pub struct AccountService {
    config: Arc<AppConfig>,
    db: Database,
    identity: Arc<dyn IdentityProvider>,
}

impl AccountService {
    pub fn new(config: Arc<AppConfig>, db: Database, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config,
            db,
            identity,
        }
    }

    /// Creates the identity at the provider, then the local user row.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, AuthError> {
        let email = normalize_email(&request.email)?;
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        let role = normalize_role(request.role.as_deref())?;
        let full_name = request
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        debug!("Registering user {}", email);

        let provider_user = self
            .identity
            .create_user(&NewAccount {
                email: email.clone(),
                password: request.password,
                display_name: full_name.clone(),
            })
            .await
            .map_err(|e| match e {
                IdentityError::AlreadyExists => AuthError::EmailExists,
                other => AuthError::Identity(other),
            })?;

        let uid = provider_user.uid.clone();
        let stored_email = provider_user.email.clone();
        let stored_name = provider_user.display_name.clone().or(full_name);
        let stored_role = role.clone();

        let insert = self
            .db
            .run(move |conn| {
                users::create_user(
                    conn,
                    CreateUser {
                        firebase_uid: &uid,
                        email: &stored_email,
                        full_name: stored_name.as_deref(),
                        role: &stored_role,
                    },
                )
            })
            .await;

        let user = match insert {
            Ok(user) => user,
            Err(err) => {
                warn!(
                    "Persisting user {} failed, removing provider identity: {}",
                    provider_user.email, err
                );
                if let Err(cleanup) = self.identity.delete_user(&provider_user.uid).await {
                    warn!(
                        "Provider identity {} is orphaned: {}",
                        provider_user.uid, cleanup
                    );
                }
                return Err(match err {
                    DbError::UniqueViolation(_) => AuthError::EmailExists,
                    other => AuthError::Database(other),
                });
            }
        };

        let token = create_access_token(&self.config, &user.email, &user.firebase_uid, &user.role)?;
        info!("Registered user {} with role {}", user.email, user.role);

        Ok(UserResponse {
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            token,
            token_type: "bearer".to_string(),
        })
    }

    pub async fn login(&self, form: LoginForm) -> Result<UserResponse, AuthError> {
        let email = normalize_email(&form.username).map_err(|_| AuthError::InvalidCredentials)?;

        let provider_user = self
            .identity
            .get_user_by_email(&email)
            .await
            .map_err(|e| match e {
                IdentityError::NotFound => AuthError::InvalidCredentials,
                other => AuthError::Identity(other),
            })?;

        self.identity
            .verify_password(&provider_user.email, &form.password)
            .await
            .map_err(|e| match e {
                IdentityError::InvalidCredentials | IdentityError::NotFound => {
                    AuthError::InvalidCredentials
                }
                other => AuthError::Identity(other),
            })?;

        // Only reveal the disabled state to callers holding the password.
        if provider_user.disabled {
            return Err(AuthError::AccountDisabled);
        }

        let uid = provider_user.uid.clone();
        let user = self
            .db
            .run(move |conn| users::get_user_by_firebase_uid(conn, &uid))
            .await?
            .ok_or_else(|| {
                warn!(
                    "Identity {} has no local user row, refusing login",
                    provider_user.uid
                );
                AuthError::InvalidCredentials
            })?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let token = create_access_token(&self.config, &user.email, &user.firebase_uid, &user.role)?;
        debug!("Issued token for {} with role {}", user.email, user.role);

        Ok(UserResponse {
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            token,
            token_type: "bearer".to_string(),
        })
    }

    pub async fn profile(&self, caller: &User) -> Result<ProfileResponse, AuthError> {
        let uid = caller.uid.clone();
        let user = self
            .db
            .run(move |conn| users::get_user_by_firebase_uid(conn, &uid))
            .await?
            .ok_or(AuthError::ProfileNotFound)?;

        Ok(ProfileResponse {
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
        })
    }
}

fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::Validation("email is not a valid address".to_string()))
    }
}

fn normalize_role(raw: Option<&str>) -> Result<String, AuthError> {
    match raw {
        None => Ok(DEFAULT_ROLE.to_string()),
        Some(role) => {
            let role = role.trim().to_lowercase();
            if role.is_empty() {
                Err(AuthError::Validation("role must not be blank".to_string()))
            } else {
                Ok(role)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::{TestConfig, TestDatabase};

    use crate::services::firebase::{MockIdentityProvider, ProviderUser};

    fn provider_user(uid: &str, email: &str) -> ProviderUser {
        ProviderUser {
            uid: uid.to_string(),
            email: email.to_string(),
            display_name: None,
            disabled: false,
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secure123".to_string(),
            full_name: Some("Test User".to_string()),
            role: None,
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Test@Example.com ").unwrap(), "test@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@b@c").is_err());
    }

    #[test]
    fn test_normalize_role() {
        assert_eq!(normalize_role(None).unwrap(), "outsider");
        assert_eq!(normalize_role(Some(" Doctor ")).unwrap(), "doctor");
        assert!(normalize_role(Some("  ")).is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_without_provider_call() {
        let test_db = TestDatabase::new();
        let mut identity = MockIdentityProvider::new();
        identity.expect_create_user().never();

        let service = AccountService::new(
            TestConfig::default().to_arc(),
            test_db.db.clone(),
            Arc::new(identity),
        );

        let result = service
            .register(RegisterRequest {
                password: "123".to_string(),
                ..register_request("short@example.com")
            })
            .await;

        assert_matches!(result, Err(AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_maps_existing_identity() {
        let test_db = TestDatabase::new();
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_user()
            .times(1)
            .returning(|_| Err(IdentityError::AlreadyExists));

        let service = AccountService::new(
            TestConfig::default().to_arc(),
            test_db.db.clone(),
            Arc::new(identity),
        );

        let result = service.register(register_request("dup@example.com")).await;
        assert_matches!(result, Err(AuthError::EmailExists));
    }

    #[tokio::test]
    async fn test_register_removes_identity_when_local_insert_fails() {
        let test_db = TestDatabase::new();
        let db = test_db.db.clone();
        db.run(|conn| {
            users::create_user(
                conn,
                CreateUser {
                    firebase_uid: "uid-existing",
                    email: "taken@example.com",
                    full_name: None,
                    role: "outsider",
                },
            )
        })
        .await
        .unwrap();

        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_user()
            .returning(|account| Ok(provider_user("uid-new", &account.email)));
        identity
            .expect_delete_user()
            .withf(|uid| uid == "uid-new")
            .times(1)
            .returning(|_| Ok(()));

        let service = AccountService::new(TestConfig::default().to_arc(), db, Arc::new(identity));

        let result = service.register(register_request("taken@example.com")).await;
        assert_matches!(result, Err(AuthError::EmailExists));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let test_db = TestDatabase::new();
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_get_user_by_email()
            .returning(|email| Ok(provider_user("uid-1", email)));
        identity
            .expect_verify_password()
            .returning(|_, _| Err(IdentityError::InvalidCredentials));

        let service = AccountService::new(
            TestConfig::default().to_arc(),
            test_db.db.clone(),
            Arc::new(identity),
        );

        let result = service
            .login(LoginForm {
                username: "test@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await;
        assert_matches!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_hides_disabled_state_until_password_verified() {
        let test_db = TestDatabase::new();
        let mut identity = MockIdentityProvider::new();
        identity.expect_get_user_by_email().returning(|email| {
            Ok(ProviderUser {
                disabled: true,
                ..provider_user("uid-off", email)
            })
        });
        identity
            .expect_verify_password()
            .times(1)
            .returning(|_, _| Err(IdentityError::InvalidCredentials));

        let service = AccountService::new(
            TestConfig::default().to_arc(),
            test_db.db.clone(),
            Arc::new(identity),
        );

        let result = service
            .login(LoginForm {
                username: "off@example.com".to_string(),
                password: "guess".to_string(),
            })
            .await;
        assert_matches!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_without_local_row_is_rejected() {
        let test_db = TestDatabase::new();
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_get_user_by_email()
            .returning(|email| Ok(provider_user("orphan", email)));
        identity.expect_verify_password().returning(|_, _| Ok(()));

        let service = AccountService::new(
            TestConfig::default().to_arc(),
            test_db.db.clone(),
            Arc::new(identity),
        );

        let result = service
            .login(LoginForm {
                username: "orphan@example.com".to_string(),
                password: "secure123".to_string(),
            })
            .await;
        assert_matches!(result, Err(AuthError::InvalidCredentials));
    }
}
