use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use auth_cell::services::IdentityProvider;
use auth_cell::{auth_routes, AuthState};
use care_cell::{appointment_routes, health_record_routes, telemedicine_routes};
use hospital_cell::{hospital_routes, HospitalState};
use shared_config::AppConfig;
use shared_database::Database;

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the HealXir API!" }))
}

pub fn create_router(
    config: Arc<AppConfig>,
    db: Database,
    identity: Arc<dyn IdentityProvider>,
) -> Router {
    let auth_state = Arc::new(AuthState::new(config.clone(), db.clone(), identity));
    let hospital_state = Arc::new(HospitalState::new(config.clone(), db));

    Router::new()
        .route("/", get(root))
        .nest("/api/v1/auth", auth_routes(auth_state))
        .nest("/api/v1/hospitals", hospital_routes(hospital_state))
        .nest("/api/v1/health_records", health_record_routes(config.clone()))
        .nest("/api/v1/appointments", appointment_routes(config.clone()))
        .nest("/api/v1/telemedicine", telemedicine_routes(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_cell::services::FirebaseAuthClient;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestDatabase, TestUser};
    use tower::ServiceExt;

    fn app(test_db: &TestDatabase) -> (Router, Arc<AppConfig>) {
        let config = TestConfig::default().to_arc();
        let identity = FirebaseAuthClient::from_config(&config).unwrap();
        (
            create_router(config.clone(), test_db.db.clone(), Arc::new(identity)),
            config,
        )
    }

    #[tokio::test]
    async fn test_root_welcome_message() {
        let test_db = TestDatabase::new();
        let (app, _) = app(&test_db);

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "message": "Welcome to the HealXir API!" }));
    }

    #[tokio::test]
    async fn test_cells_are_nested_under_api_v1() {
        let test_db = TestDatabase::new();
        let (app, config) = app(&test_db);
        let token = JwtTestUtils::create_test_token(&TestUser::default(), &config);

        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/v1/hospitals/12345")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        for stub in ["health_records", "appointments", "telemedicine"] {
            let request = Request::builder()
                .uri(format!("/api/v1/{}", stub))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED, "{}", stub);
        }
    }
}
