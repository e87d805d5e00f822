//! Router-level tests for the request guards and input validation.
//!
//! These tests drive the real router with `tower::ServiceExt::oneshot`.
//! Every request here is rejected before any handler touches Supabase,
//! Stripe, or the social platform, so no external service is needed.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use tower::util::ServiceExt;
use uuid::Uuid;

use storefront_server::auth::token::issue_token;
use storefront_server::{build_router, AppState, Config};

const JWT_SECRET: &str = "integration-test-secret-0123456789ab";

fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "error".to_string(),
        supabase_url: "http://supabase.invalid".to_string(),
        supabase_service_role_key: "service-role-test-key".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_ttl_hours: 24,
        stripe_secret_key: "sk_test_123".to_string(),
        stripe_webhook_secret: "whsec_test_123".to_string(),
        social_api_base_url: "http://social.invalid".to_string(),
        social_api_token: "social-test-token".to_string(),
        post_publish_interval_secs: 3600,
        public_base_url: "http://localhost:8080".to_string(),
        client_origin: "http://localhost:3000".to_string(),
    }
}

fn test_router() -> Router {
    build_router(AppState::new(test_config()))
}

fn bearer_token(admin: bool) -> String {
    issue_token(
        Uuid::new_v4(),
        "tester@example.com",
        admin,
        JWT_SECRET,
        24,
    )
    .unwrap()
    .access_token
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_is_public() {
    let response = test_router()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Admin guard
// ============================================================================

#[tokio::test]
async fn admin_route_without_token_is_unauthorized() {
    let response = test_router()
        .oneshot(request(Method::GET, "/admin/orders", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_route_with_garbage_token_is_unauthorized() {
    let response = test_router()
        .oneshot(request(
            Method::GET,
            "/admin/orders",
            Some("not.a.jwt"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_route_with_non_bearer_header_is_bad_request() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/admin/orders")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_route_with_non_admin_token_is_forbidden() {
    let token = bearer_token(false);
    let response = test_router()
        .oneshot(request(Method::GET, "/admin/orders", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_admin_token_cannot_create_products() {
    let token = bearer_token(false);
    let response = test_router()
        .oneshot(request(
            Method::POST,
            "/admin/products",
            Some(&token),
            Some(r#"{"name": "Mug", "price_cents": 1500}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn user_listing_is_admin_only() {
    let token = bearer_token(false);
    let response = test_router()
        .oneshot(request(Method::GET, "/admin/users", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let expired = issue_token(Uuid::new_v4(), "old@example.com", true, JWT_SECRET, -2)
        .unwrap()
        .access_token;

    let response = test_router()
        .oneshot(request(Method::GET, "/admin/orders", Some(&expired), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_other_secret_is_unauthorized() {
    let forged = issue_token(Uuid::new_v4(), "evil@example.com", true, "other-secret", 24)
        .unwrap()
        .access_token;

    let response = test_router()
        .oneshot(request(Method::GET, "/admin/orders", Some(&forged), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Protected routes
// ============================================================================

#[tokio::test]
async fn me_requires_authentication() {
    let response = test_router()
        .oneshot(request(Method::GET, "/auth/me", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_requires_authentication() {
    let response = test_router()
        .oneshot(request(Method::GET, "/cart", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_requires_authentication() {
    let response = test_router()
        .oneshot(request(Method::POST, "/checkout", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn social_metrics_requires_authentication() {
    let response = test_router()
        .oneshot(request(Method::GET, "/social/metrics", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Input validation (rejected before any store access)
// ============================================================================

#[tokio::test]
async fn register_rejects_invalid_email() {
    let response = test_router()
        .oneshot(request(
            Method::POST,
            "/auth/register",
            None,
            Some(r#"{"email": "not-an-email", "username": "shopper", "password": "password123"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_bad_username() {
    let response = test_router()
        .oneshot(request(
            Method::POST,
            "/auth/register",
            None,
            Some(r#"{"email": "a@example.com", "username": "x", "password": "password123"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_short_password() {
    let response = test_router()
        .oneshot(request(
            Method::POST,
            "/auth/register",
            None,
            Some(r#"{"email": "b@example.com", "username": "shopper", "password": "short"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedule_post_rejects_past_time() {
    let token = bearer_token(false);
    let response = test_router()
        .oneshot(request(
            Method::POST,
            "/social/posts",
            Some(&token),
            Some(r#"{"body": "Sale starts now!", "scheduled_for": "2020-01-01T00:00:00Z"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedule_post_rejects_empty_body() {
    let token = bearer_token(false);
    let response = test_router()
        .oneshot(request(
            Method::POST,
            "/social/posts",
            Some(&token),
            Some(r#"{"body": "   ", "scheduled_for": "2099-01-01T00:00:00Z"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_cart_item_rejects_zero_quantity() {
    let token = bearer_token(false);
    let body = format!(
        r#"{{"product_id": "{}", "quantity": 0}}"#,
        Uuid::new_v4()
    );
    let response = test_router()
        .oneshot(request(Method::POST, "/cart/items", Some(&token), Some(&body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Webhook signature gate
// ============================================================================

#[tokio::test]
async fn webhook_without_signature_is_bad_request() {
    let response = test_router()
        .oneshot(request(
            Method::POST,
            "/payments/webhook",
            None,
            Some(r#"{"id": "evt_1", "type": "checkout.session.completed", "data": {"object": {}}}"#),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_with_wrong_signature_is_unauthorized() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/payments/webhook")
                .header(header::CONTENT_TYPE, "application/json")
                .header("Stripe-Signature", "t=123,v1=deadbeef")
                .body(Body::from(
                    r#"{"id": "evt_1", "type": "checkout.session.completed", "data": {"object": {}}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
