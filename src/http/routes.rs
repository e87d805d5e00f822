//! HTTP route definitions

use axum::{
    extract::{Extension, Path, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password, PasswordError, DUMMY_HASH};
use crate::auth::token::{issue_token, TokenResponse};
use crate::http::middleware::{require_admin, require_auth, AuthenticatedUser};
use crate::payments::stripe::StripeError;
use crate::payments::webhook::stripe_webhook_handler;
use crate::store::supabase::SupabaseError;
use crate::store::users::UserView;
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/products", get(list_products_handler))
        .route("/products/:id", get(get_product_handler))
        .route("/payments/webhook", post(stripe_webhook_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/cart", get(get_cart_handler))
        .route("/cart/items", post(add_cart_item_handler))
        .route("/cart/items/:product_id", delete(remove_cart_item_handler))
        .route("/checkout", post(checkout_handler))
        .route("/orders", get(list_orders_handler))
        .route("/social/metrics", get(social_metrics_handler))
        .route(
            "/social/posts",
            get(list_posts_handler).post(schedule_post_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Admin routes (auth + admin claim). Layers run outermost-last, so
    // require_auth wraps require_admin and populates the extensions first.
    let admin_routes = Router::new()
        .route("/admin/products", post(create_product_handler))
        .route(
            "/admin/products/:id",
            patch(update_product_handler).delete(delete_product_handler),
        )
        .route("/admin/orders", get(admin_list_orders_handler))
        .route("/admin/users", get(admin_list_users_handler))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    posts_published: u64,
    publish_failures: u64,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        posts_published: state.publisher.published_total(),
        publish_failures: state.publisher.failed_total(),
    })
}

// ============================================================================
// Auth endpoints
// ============================================================================

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    username: String,
    password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    user: UserView,
    token: TokenResponse,
}

async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();

    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    if req.username.len() < 3
        || req.username.len() > 32
        || !req.username.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        return Err(AppError::BadRequest(
            "Username must be 3-32 characters, letters/digits/underscore only".to_string(),
        ));
    }

    if req.password.len() < crate::auth::password::MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            crate::auth::password::MIN_PASSWORD_LENGTH
        )));
    }

    if !state.register_limiter.check(&email) {
        return Err(AppError::RateLimited);
    }

    // Cheap existence check first; the database unique constraint still
    // backstops the race between check and insert
    if state.user_store.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;

    let user = state
        .user_store
        .create(&email, &req.username, &password_hash)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                AppError::Conflict("Email or username is already registered".to_string())
            } else {
                AppError::from(e)
            }
        })?;

    let token = issue_token(
        user.id,
        &user.email,
        user.admin,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(AuthResponse {
        user: UserView::from(&user),
        token,
    }))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();

    if !state.login_limiter.check(&email) {
        return Err(AppError::RateLimited);
    }

    let user = state.user_store.find_by_email(&email).await?;

    // Verify against a dummy hash when the account is missing so the
    // response timing does not reveal which emails exist
    let stored_hash = user
        .as_ref()
        .map(|u| u.password_hash.as_str())
        .unwrap_or(DUMMY_HASH);

    let password_valid = verify_password(&req.password, stored_hash);

    let user = match user {
        Some(user) if password_valid => user,
        _ => return Err(AppError::BadCredentials),
    };

    let token = issue_token(
        user.id,
        &user.email,
        user.admin,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(AuthResponse {
        user: UserView::from(&user),
        token,
    }))
}

async fn me_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<UserView>, AppError> {
    let user = state
        .user_store
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

    Ok(Json(UserView::from(&user)))
}

// ============================================================================
// Catalog endpoints
// ============================================================================

async fn list_products_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = state.product_store.list_active().await?;
    Ok(Json(products))
}

async fn get_product_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .product_store
        .get_active(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(Json(product))
}

// ============================================================================
// Cart endpoints
// ============================================================================

#[derive(Serialize)]
struct CartResponse {
    items: Vec<CartLineResponse>,
    total_cents: i64,
}

#[derive(Serialize)]
struct CartLineResponse {
    product_id: Uuid,
    name: String,
    unit_price_cents: i64,
    quantity: i32,
    line_total_cents: i64,
}

async fn get_cart_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = state.cart_store.get_cart(auth.user_id).await?;

    let items: Vec<CartLineResponse> = cart
        .into_iter()
        .filter_map(|row| {
            row.product.map(|p| CartLineResponse {
                product_id: row.product_id,
                name: p.name,
                unit_price_cents: p.price_cents,
                quantity: row.quantity,
                line_total_cents: p.price_cents * row.quantity as i64,
            })
        })
        .collect();

    let total_cents = items.iter().map(|i| i.line_total_cents).sum();

    Ok(Json(CartResponse { items, total_cents }))
}

#[derive(Deserialize)]
struct AddCartItemRequest {
    product_id: Uuid,
    quantity: i32,
}

async fn add_cart_item_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<AddCartItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".to_string()));
    }

    // Only purchasable products can enter a cart
    state
        .product_store
        .get_active(req.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    state
        .cart_store
        .set_item(auth.user_id, req.product_id, req.quantity)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn remove_cart_item_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.cart_store.remove_item(auth.user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Checkout and order endpoints
// ============================================================================

#[derive(Serialize)]
struct CheckoutResponse {
    session_id: String,
    url: String,
}

async fn checkout_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let response = state
        .stripe
        .create_checkout_session(auth.user_id)
        .await
        .map_err(|e| match e {
            StripeError::EmptyCart => AppError::BadRequest("Cart is empty".to_string()),
            StripeError::ItemUnavailable(id) => {
                AppError::BadRequest(format!("Cart item {} is no longer available", id))
            }
            other => AppError::Internal(other.to_string()),
        })?;

    Ok(Json(CheckoutResponse {
        session_id: response.session_id,
        url: response.url,
    }))
}

async fn list_orders_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.order_store.list_for_user(auth.user_id).await?;
    Ok(Json(orders))
}

// ============================================================================
// Social endpoints
// ============================================================================

async fn social_metrics_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let metrics = state.social.fetch_metrics().await.map_err(|e| {
        tracing::warn!(error = %e, "Metrics fetch failed");
        AppError::Upstream("Social platform request failed".to_string())
    })?;
    Ok(Json(metrics))
}

async fn list_posts_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let posts = state.post_store.list_for_user(auth.user_id).await?;
    Ok(Json(posts))
}

#[derive(Deserialize)]
struct SchedulePostRequest {
    body: String,
    scheduled_for: DateTime<Utc>,
}

async fn schedule_post_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<SchedulePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let body = req.body.trim();
    if body.is_empty() || body.chars().count() > 500 {
        return Err(AppError::BadRequest(
            "Post body must be 1-500 characters".to_string(),
        ));
    }

    if req.scheduled_for <= Utc::now() {
        return Err(AppError::BadRequest(
            "Scheduled time must be in the future".to_string(),
        ));
    }

    let post = state
        .post_store
        .schedule(auth.user_id, body, req.scheduled_for)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

// ============================================================================
// Admin endpoints
// ============================================================================

#[derive(Deserialize)]
struct CreateProductRequest {
    name: String,
    description: Option<String>,
    price_cents: i64,
    /// Defaults to empty stock
    #[serde(default)]
    stock: i32,
}

async fn create_product_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name is required".to_string()));
    }
    if req.price_cents <= 0 {
        return Err(AppError::BadRequest("Price must be positive".to_string()));
    }
    if req.stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".to_string()));
    }

    let product = state
        .product_store
        .create(name, req.description, req.price_cents, req.stock)
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Deserialize)]
struct UpdateProductRequest {
    name: Option<String>,
    description: Option<String>,
    price_cents: Option<i64>,
    stock: Option<i32>,
    active: Option<bool>,
}

async fn update_product_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(price) = req.price_cents {
        if price <= 0 {
            return Err(AppError::BadRequest("Price must be positive".to_string()));
        }
    }
    if let Some(stock) = req.stock {
        if stock < 0 {
            return Err(AppError::BadRequest("Stock cannot be negative".to_string()));
        }
    }

    state
        .product_store
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    state
        .product_store
        .update(
            product_id,
            crate::store::catalog::ProductUpdate {
                name: req.name,
                description: req.description,
                price_cents: req.price_cents,
                stock: req.stock,
                active: req.active,
            },
        )
        .await?;

    let updated = state
        .product_store
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(updated))
}

async fn delete_product_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .product_store
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    state.product_store.deactivate(product_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn admin_list_orders_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.order_store.list_all().await?;
    Ok(Json(orders))
}

async fn admin_list_users_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let users = state.user_store.list_all().await?;
    // Never expose password hashes, even to admins
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();
    Ok(Json(views))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid email or password")]
    BadCredentials,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SupabaseError> for AppError {
    fn from(err: SupabaseError) -> Self {
        if err.is_unique_violation() {
            AppError::Conflict("Resource already exists".to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort(_) => AppError::BadRequest(err.to_string()),
            PasswordError::Hash(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BadCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
            ),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            AppError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::BadCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::RateLimited.into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Upstream("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = AppError::from(SupabaseError::Api {
            status: 409,
            body: r#"{"code":"23505"}"#.to_string(),
        });
        assert!(matches!(err, AppError::Conflict(_)));

        let err = AppError::from(SupabaseError::NoRowReturned);
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn short_password_maps_to_bad_request() {
        let err = AppError::from(PasswordError::TooShort(8));
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
