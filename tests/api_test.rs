//! Integration tests for API endpoints.
//!
//! The full router runs over mocked services, so neither PostgreSQL nor Redis
//! is needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use domain::{permissions, GeneratedCode, PermissionSet};
use tenant_admin::api::{create_router, AppState};
use tenant_admin::errors::AppError;
use tenant_admin::infra::{MockHealthProbe, MockRateLimiter};
use tenant_admin::services::{
    AuthService, Claims, MockAuthService, MockServiceContainer, MockSystemVariableService,
    SystemVariableService, TokenResponse,
};

const VALID_TOKEN: &str = "valid-test-token";

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    auth: MockAuthService,
    system_variables: MockSystemVariableService,
    limiter: MockRateLimiter,
    database_up: bool,
    redis_up: bool,
}

impl Harness {
    fn new() -> Self {
        let mut limiter = MockRateLimiter::new();
        limiter
            .expect_check_rate_limit()
            .returning(|_, _, _| Ok((1, true)));

        Self {
            auth: MockAuthService::new(),
            system_variables: MockSystemVariableService::new(),
            limiter,
            database_up: true,
            redis_up: true,
        }
    }

    /// Accept [`VALID_TOKEN`] for a user of `organization_id` holding `codes`.
    fn signed_in(mut self, user_id: Uuid, organization_id: Uuid, codes: &[&str]) -> Self {
        self.auth.expect_verify_token().returning(move |token| {
            if token == VALID_TOKEN {
                Ok(Claims {
                    sub: user_id,
                    org: organization_id,
                    email: "jane@acme.example".to_string(),
                    exp: Utc::now().timestamp() + 3600,
                    iat: Utc::now().timestamp(),
                })
            } else {
                Err(AppError::Unauthorized)
            }
        });

        let granted = PermissionSet::new(codes.iter().copied());
        self.auth
            .expect_permissions_for()
            .returning(move |_| Ok(granted.clone()));
        self
    }

    fn router(self) -> Router {
        let auth: Arc<dyn AuthService> = Arc::new(self.auth);
        let system_variables: Arc<dyn SystemVariableService> = Arc::new(self.system_variables);

        let mut services = MockServiceContainer::new();
        services.expect_auth().returning(move || auth.clone());
        services
            .expect_system_variables()
            .returning(move || system_variables.clone());

        let state = AppState::new(
            Arc::new(services),
            Arc::new(self.limiter),
            Arc::new(probe(self.database_up)),
            Arc::new(probe(self.redis_up)),
        );
        create_router(state)
    }
}

fn probe(up: bool) -> MockHealthProbe {
    let mut probe = MockHealthProbe::new();
    probe.expect_ping().returning(move || {
        if up {
            Ok(())
        } else {
            Err(AppError::internal("connection refused"))
        }
    });
    probe
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_both_backends() {
    let response = Harness::new()
        .router()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"]["status"], "healthy");
    assert_eq!(body["services"]["redis"]["status"], "healthy");
}

#[tokio::test]
async fn health_degrades_when_redis_is_down() {
    let mut harness = Harness::new();
    harness.redis_up = false;

    let response = harness
        .router()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["redis"]["status"], "unhealthy");
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn login_returns_a_bearer_token() {
    let mut harness = Harness::new();
    harness
        .auth
        .expect_login()
        .withf(|email, password| email == "jane@acme.example" && password == "SecurePass123!")
        .returning(|_, _| {
            Ok(TokenResponse {
                access_token: "signed.jwt.token".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 86400,
            })
        });

    let body = json!({"email": "jane@acme.example", "password": "SecurePass123!"});
    let response = harness
        .router()
        .oneshot(request(Method::POST, "/api/admin/auth/login", None, Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["access_token"], "signed.jwt.token");
    assert_eq!(body["data"]["token_type"], "Bearer");
}

#[tokio::test]
async fn login_rejects_malformed_email() {
    let mut harness = Harness::new();
    harness.auth.expect_login().never();

    let body = json!({"email": "not-an-email", "password": "x"});
    let response = harness
        .router()
        .oneshot(request(Method::POST, "/api/admin/auth/login", None, Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let response = Harness::new()
        .router()
        .oneshot(request(Method::GET, "/api/admin/system-variables", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_tokens_are_rejected() {
    let response = Harness::new()
        .signed_in(Uuid::new_v4(), Uuid::new_v4(), &[permissions::ALL])
        .router()
        .oneshot(request(
            Method::GET,
            "/api/admin/system-variables",
            Some("forged-token"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Authorization and numbering
// =============================================================================

#[tokio::test]
async fn generation_requires_the_generate_permission() {
    let mut harness =
        Harness::new().signed_in(Uuid::new_v4(), Uuid::new_v4(), &[permissions::SYSTEM_VARIABLES_READ]);
    harness.system_variables.expect_generate().never();

    let uri = format!("/api/admin/system-variables/{}/generate", Uuid::new_v4());
    let response = harness
        .router()
        .oneshot(request(Method::POST, &uri, Some(VALID_TOKEN), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn generated_code_is_returned_as_created() {
    let user_id = Uuid::new_v4();
    let organization_id = Uuid::new_v4();
    let variable_id = Uuid::new_v4();

    let mut harness = Harness::new().signed_in(
        user_id,
        organization_id,
        &[permissions::SYSTEM_VARIABLES_GENERATE],
    );
    harness
        .system_variables
        .expect_generate()
        .withf(move |caller, id| {
            caller.user_id == user_id && caller.organization_id == organization_id && *id == variable_id
        })
        .times(1)
        .returning(move |caller, id| {
            Ok(GeneratedCode {
                id: Uuid::new_v4(),
                variable_id: id,
                code: "INV-0001".to_string(),
                number: 1,
                generated_by: Some(caller.user_id),
                generated_at: Utc::now(),
            })
        });

    let uri = format!("/api/admin/system-variables/{}/generate", variable_id);
    let response = harness
        .router()
        .oneshot(request(Method::POST, &uri, Some(VALID_TOKEN), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["code"], "INV-0001");
    assert_eq!(body["data"]["number"], 1);
}

#[tokio::test]
async fn service_errors_keep_the_envelope() {
    let mut harness =
        Harness::new().signed_in(Uuid::new_v4(), Uuid::new_v4(), &[permissions::SYSTEM_VARIABLES_READ]);
    harness
        .system_variables
        .expect_preview_next()
        .returning(|_, _| Err(AppError::not_found("System variable")));

    let uri = format!("/api/admin/system-variables/{}/next", Uuid::new_v4());
    let response = harness
        .router()
        .oneshot(request(Method::GET, &uri, Some(VALID_TOKEN), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn exhausted_budget_returns_429() {
    let mut harness = Harness::new();
    let mut limiter = MockRateLimiter::new();
    limiter
        .expect_check_rate_limit()
        .returning(|_, max, _| Ok((max + 1, false)));
    harness.limiter = limiter;
    harness.auth.expect_login().never();

    let body = json!({"email": "jane@acme.example", "password": "SecurePass123!"});
    let response = harness
        .router()
        .oneshot(request(Method::POST, "/api/admin/auth/login", None, Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let body = json_body(response).await;
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn limiter_outage_denies_requests() {
    let mut harness = Harness::new();
    let mut limiter = MockRateLimiter::new();
    limiter
        .expect_check_rate_limit()
        .returning(|_, _, _| Err(AppError::internal("redis unavailable")));
    harness.limiter = limiter;

    let response = harness
        .router()
        .oneshot(request(
            Method::GET,
            "/api/admin/system-variables",
            Some(VALID_TOKEN),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
