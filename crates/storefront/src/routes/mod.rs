//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Auth
//! POST /auth/register          - Create an account, returns a session
//! POST /auth/login             - Sign in, returns a session
//! POST /auth/refresh           - Exchange the bearer token for a fresh one
//! POST /auth/logout            - Revoke the bearer token
//!
//! # Products
//! GET  /products               - Product listing (category, minPrice, maxPrice, search)
//! GET  /products/{id}          - Product detail
//! POST /products               - Add a product (requires auth)
//!
//! # Cart (requires auth)
//! GET  /cart                   - Cart lines, items and summary
//! POST /cart/add               - Add units of a product
//! POST /cart/update            - Set a line's quantity (zero removes it)
//! POST /cart/remove            - Remove a line
//! POST /cart/checkout          - No-op
//! ```

pub mod auth;
pub mod cart;
pub mod products;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{make_request_span, request_id_middleware};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes())
}

/// The storefront application with its middleware stack.
pub fn app(state: AppState) -> Router {
    routes()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::backend::memory::{MemoryDocumentStore, MemoryIdentityProvider};
    use crate::config::StorefrontConfig;
    use crate::middleware::REQUEST_ID_HEADER;

    fn test_app() -> Router {
        app(AppState::new(
            StorefrontConfig::default(),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryIdentityProvider::new().with_fast_hashing()),
        ))
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = test_app()
            .oneshot(
                Request::get("/health")
                    .header(REQUEST_ID_HEADER, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-42");
    }

    #[tokio::test]
    async fn test_cart_requires_bearer_token() {
        let response = test_app()
            .oneshot(Request::get("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
