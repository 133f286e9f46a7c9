use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::Database;
use shared_models::auth::{JwtClaims, User};

use crate::jwt::create_access_token;

pub const TEST_PROJECT_ID: &str = "healxir-test";

pub struct TestConfig {
    pub jwt_secret: String,
    pub tomtom_base_url: String,
    pub firebase_emulator_host: Option<String>,
    pub firebase_web_api_key: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            tomtom_base_url: "http://localhost:9".to_string(),
            firebase_emulator_host: Some("localhost:9099".to_string()),
            firebase_web_api_key: None,
        }
    }
}

impl TestConfig {
    /// Points both external providers at a single mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            tomtom_base_url: uri.to_string(),
            firebase_emulator_host: Some(
                uri.trim_start_matches("http://")
                    .trim_start_matches("https://")
                    .to_string(),
            ),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            jwt_secret_key: self.jwt_secret.clone(),
            tomtom_api_key: "test-tomtom-key".to_string(),
            tomtom_base_url: self.tomtom_base_url.clone(),
            firebase_project_id: Some(TEST_PROJECT_ID.to_string()),
            firebase_auth_emulator_host: self.firebase_emulator_host.clone(),
            firebase_web_api_key: self.firebase_web_api_key.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// A migrated SQLite database in a temporary directory. The directory is
/// removed when the value is dropped.
pub struct TestDatabase {
    _dir: TempDir,
    pub db: Database,
}

impl TestDatabase {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("healxir-test.db");
        let db = Database::connect(&path.display().to_string(), 4).expect("open test database");
        db.run_migrations().expect("migrate test database");
        Self { _dir: dir, db }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TestUser {
    pub uid: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            uid: Uuid::new_v4().simple().to_string(),
            email: "test@example.com".to_string(),
            role: "outsider".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            email: email.to_string(),
            role: role.to_string(),
            ..Self::default()
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn outsider(email: &str) -> Self {
        Self::new(email, "outsider")
    }

    pub fn to_user(&self) -> User {
        User {
            uid: self.uid.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, config: &AppConfig) -> String {
        create_access_token(config, &user.email, &user.uid, &user.role).expect("sign test token")
    }

    pub fn create_expired_token(user: &TestUser, config: &AppConfig) -> String {
        let issued = Utc::now() - Duration::hours(2);
        let claims = JwtClaims {
            sub: user.email.clone(),
            uid: user.uid.clone(),
            role: user.role.clone(),
            iat: issued.timestamp(),
            exp: (issued + Duration::hours(1)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret_key.as_bytes()),
        )
        .expect("sign expired token")
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Response bodies of the Identity Toolkit REST API.
pub struct MockFirebaseResponses;

impl MockFirebaseResponses {
    pub fn created_user(uid: &str, email: &str, display_name: &str) -> serde_json::Value {
        json!({
            "kind": "identitytoolkit#SignupNewUserResponse",
            "localId": uid,
            "email": email,
            "displayName": display_name
        })
    }

    pub fn lookup(uid: &str, email: &str, display_name: &str) -> serde_json::Value {
        Self::account_info(uid, email, display_name, false)
    }

    pub fn disabled_lookup(uid: &str, email: &str, display_name: &str) -> serde_json::Value {
        Self::account_info(uid, email, display_name, true)
    }

    fn account_info(uid: &str, email: &str, display_name: &str, disabled: bool) -> serde_json::Value {
        json!({
            "kind": "identitytoolkit#GetAccountInfoResponse",
            "users": [{
                "localId": uid,
                "email": email,
                "displayName": display_name,
                "emailVerified": false,
                "disabled": disabled,
                "createdAt": "1700000000000"
            }]
        })
    }

    pub fn empty_lookup() -> serde_json::Value {
        json!({ "kind": "identitytoolkit#GetAccountInfoResponse" })
    }

    pub fn signed_in(uid: &str, email: &str) -> serde_json::Value {
        json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": uid,
            "email": email,
            "idToken": "id-token",
            "registered": true,
            "refreshToken": "refresh-token",
            "expiresIn": "3600"
        })
    }

    pub fn error(code: u16, message: &str) -> serde_json::Value {
        json!({
            "error": {
                "code": code,
                "message": message,
                "errors": [{ "message": message, "domain": "global", "reason": "invalid" }]
            }
        })
    }
}

/// Response bodies of the TomTom POI search API.
pub struct MockTomTomResponses;

impl MockTomTomResponses {
    pub fn hospitals() -> serde_json::Value {
        json!({
            "summary": { "numResults": 3 },
            "results": [
                {
                    "type": "POI",
                    "poi": { "name": "Apollo Hospitals" },
                    "address": { "freeformAddress": "Greams Road, Chennai, Tamil Nadu" },
                    "dist": 350.2,
                    "position": { "lat": 13.0674, "lon": 80.2785 }
                },
                {
                    "type": "POI",
                    "poi": { "name": "AIIMS Patna" },
                    "address": { "freeformAddress": "Phulwari Sharif, Patna, Bihar" },
                    "dist": 450.5,
                    "position": { "lat": 25.5957, "lon": 85.1355 }
                },
                {
                    "type": "POI",
                    "poi": { "name": "CMC Vellore" },
                    "address": { "freeformAddress": "Bagayam, Vellore, Tamil Nadu" },
                    "dist": 500.6,
                    "position": { "lat": 12.9333, "lon": 79.1333 }
                }
            ]
        })
    }

    pub fn empty() -> serde_json::Value {
        json!({ "summary": { "numResults": 0 }, "results": [] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::with_mock_server("http://127.0.0.1:4010").to_app_config();

        assert_eq!(config.tomtom_base_url, "http://127.0.0.1:4010");
        assert_eq!(config.firebase_auth_emulator_host.as_deref(), Some("127.0.0.1:4010"));
        assert!(!config.jwt_secret_key.is_empty());
    }

    #[test]
    fn test_tokens() {
        let config = TestConfig::default().to_app_config();
        let user = TestUser::doctor("doc@example.com");

        let valid = JwtTestUtils::create_test_token(&user, &config);
        assert_eq!(validate_token(&valid, &config).unwrap(), user.to_user());

        let expired = JwtTestUtils::create_expired_token(&user, &config);
        assert!(validate_token(&expired, &config).is_err());
    }
}
