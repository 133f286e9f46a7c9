// libs/auth-cell/src/services/firebase.rs
use std::fs;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EMULATOR_PROJECT_ID: &str = "demo-healxir";
const OAUTH_SCOPES: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("user already exists")]
    AlreadyExists,

    #[error("user not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("identity provider is not configured: {0}")]
    Configuration(String),

    #[error("{0}")]
    Provider(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Provider(format!("request failed: {}", err))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// An account as known to the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub disabled: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_user(&self, account: &NewAccount) -> Result<ProviderUser, IdentityError>;

    async fn get_user_by_email(&self, email: &str) -> Result<ProviderUser, IdentityError>;

    /// Fails with `InvalidCredentials` when the provider rejects the password.
    async fn verify_password(&self, email: &str, password: &str) -> Result<(), IdentityError>;

    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    project_id: String,
    private_key: String,
    client_email: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

enum Credentials {
    /// The auth emulator accepts the fixed `owner` token.
    Emulator,
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
}

impl AccountRecord {
    fn into_user(self, fallback_email: &str) -> ProviderUser {
        ProviderUser {
            uid: self.local_id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            display_name: self.display_name.filter(|n| !n.is_empty()),
            disabled: self.disabled,
        }
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountRecord>,
}

/// Firebase Authentication through the Identity Toolkit REST API.
/// Based on: https://cloud.google.com/identity-platform/docs/reference/rest
pub struct FirebaseAuthClient {
    client: Client,
    base_url: String,
    project_id: String,
    web_api_key: Option<String>,
    credentials: Credentials,
}

impl FirebaseAuthClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, IdentityError> {
        if let Some(host) = &config.firebase_auth_emulator_host {
            let project_id = config
                .firebase_project_id
                .clone()
                .unwrap_or_else(|| EMULATOR_PROJECT_ID.to_string());
            info!("Using Firebase Auth emulator at {} (project {})", host, project_id);

            return Ok(Self {
                client: Client::new(),
                base_url: format!("http://{}/identitytoolkit.googleapis.com", host),
                project_id,
                // The emulator accepts any key for password sign-in.
                web_api_key: Some(
                    config
                        .firebase_web_api_key
                        .clone()
                        .unwrap_or_else(|| "emulator".to_string()),
                ),
                credentials: Credentials::Emulator,
            });
        }

        let raw = fs::read_to_string(&config.firebase_credentials_path).map_err(|e| {
            IdentityError::Configuration(format!(
                "cannot read {}: {}",
                config.firebase_credentials_path, e
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            IdentityError::Configuration(format!("malformed service account file: {}", e))
        })?;

        let project_id = config
            .firebase_project_id
            .clone()
            .unwrap_or_else(|| key.project_id.clone());

        if !config.is_password_verification_enabled() {
            warn!("FIREBASE_WEB_API_KEY not set, login will not verify passwords");
        }

        info!("Using Firebase project {} as identity provider", project_id);

        Ok(Self {
            client: Client::new(),
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
            project_id,
            web_api_key: config.firebase_web_api_key.clone(),
            credentials: Credentials::ServiceAccount {
                key,
                cached: Mutex::new(None),
            },
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn bearer_token(&self) -> Result<String, IdentityError> {
        match &self.credentials {
            Credentials::Emulator => Ok("owner".to_string()),
            Credentials::ServiceAccount { key, cached } => {
                let mut cached = cached.lock().await;
                if let Some(token) = cached.as_ref() {
                    if token.expires_at > Utc::now() + Duration::seconds(60) {
                        return Ok(token.token.clone());
                    }
                }

                let fresh = self.fetch_access_token(key).await?;
                let token = fresh.token.clone();
                *cached = Some(fresh);
                Ok(token)
            }
        }
    }

    /// OAuth2 JWT-bearer grant with the service account's private key.
    async fn fetch_access_token(&self, key: &ServiceAccountKey) -> Result<CachedToken, IdentityError> {
        debug!("Requesting Google OAuth access token for {}", key.client_email);

        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: OAUTH_SCOPES,
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| IdentityError::Configuration(format!("invalid private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| IdentityError::Configuration(format!("cannot sign assertion: {}", e)))?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("OAuth token request failed: {} - {}", status, body);
            return Err(IdentityError::Provider(format!(
                "OAuth token request failed with {}",
                status
            )));
        }

        let token: OAuthTokenResponse = response.json().await?;
        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }

    async fn post_admin(&self, path: &str, body: Value) -> Result<Value, IdentityError> {
        let url = format!("{}/v1/projects/{}/{}", self.base_url, self.project_id, path);
        debug!("Identity Toolkit request: POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.bearer_token().await?)
            .json(&body)
            .send()
            .await?;

        read_response(response).await
    }
}

/// Extracts the error code from a body like
/// `{"error": {"message": "WEAK_PASSWORD : Password should be ..."}}`.
fn provider_error_code(body: &Value) -> Option<&str> {
    body.get("error")?
        .get("message")?
        .as_str()
        .and_then(|m| m.split([' ', ':']).find(|part| !part.is_empty()))
}

fn classify_error(status: StatusCode, body: &Value) -> IdentityError {
    match provider_error_code(body) {
        Some("EMAIL_EXISTS" | "DUPLICATE_EMAIL") => IdentityError::AlreadyExists,
        Some("USER_NOT_FOUND") => IdentityError::NotFound,
        Some(
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED",
        ) => IdentityError::InvalidCredentials,
        Some(code) => IdentityError::Provider(format!("{} ({})", code, status)),
        None => IdentityError::Provider(format!("unexpected response ({})", status)),
    }
}

async fn read_response(response: reqwest::Response) -> Result<Value, IdentityError> {
    let status = response.status();
    let text = response.text().await?;
    let body: Value = if text.is_empty() {
        json!({})
    } else {
        serde_json::from_str(&text)
            .map_err(|e| IdentityError::Provider(format!("malformed response: {}", e)))?
    };

    if status.is_success() {
        Ok(body)
    } else {
        let err = classify_error(status, &body);
        if matches!(err, IdentityError::Provider(_)) {
            error!("Identity Toolkit error: {} - {}", status, text);
        }
        Err(err)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuthClient {
    async fn create_user(&self, account: &NewAccount) -> Result<ProviderUser, IdentityError> {
        info!("Creating identity for {}", account.email);

        let mut body = json!({
            "email": account.email,
            "password": account.password,
        });
        if let Some(name) = account.display_name.as_deref().filter(|n| !n.is_empty()) {
            body["displayName"] = json!(name);
        }

        let value = self.post_admin("accounts", body).await?;
        let record: AccountRecord = serde_json::from_value(value)
            .map_err(|e| IdentityError::Provider(format!("malformed sign-up response: {}", e)))?;

        let mut user = record.into_user(&account.email);
        // The admin sign-up response may omit the display name.
        if user.display_name.is_none() {
            user.display_name = account.display_name.clone().filter(|n| !n.is_empty());
        }
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<ProviderUser, IdentityError> {
        let value = self
            .post_admin("accounts:lookup", json!({ "email": [email] }))
            .await?;
        let lookup: LookupResponse = serde_json::from_value(value)
            .map_err(|e| IdentityError::Provider(format!("malformed lookup response: {}", e)))?;

        lookup
            .users
            .into_iter()
            .next()
            .map(|record| record.into_user(email))
            .ok_or(IdentityError::NotFound)
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<(), IdentityError> {
        let Some(api_key) = &self.web_api_key else {
            debug!("Password verification skipped, no web API key configured");
            return Ok(());
        };

        let url = format!("{}/v1/accounts:signInWithPassword", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": false,
            }))
            .send()
            .await?;

        read_response(response).await.map(|_| ())
    }

    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError> {
        warn!("Deleting identity {}", uid);
        self.post_admin("accounts:delete", json!({ "localId": uid }))
            .await
            .map(|_| ())
    }
}
