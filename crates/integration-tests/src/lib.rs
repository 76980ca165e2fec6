//! Integration tests for Digital Mart.
//!
//! The storefront router runs in-process over the in-memory backends, so
//! the tests need no running server:
//!
//! ```bash
//! cargo test -p digital-mart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - registration, login, token refresh and logout
//! - `catalog` - listing, filters, product detail and adding products
//! - `cart` - cart mutations, totals and concurrent updates

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use digital_mart_core::{Category, Price, ProductId};
use digital_mart_storefront::backend::memory::{MemoryDocumentStore, MemoryIdentityProvider};
use digital_mart_storefront::config::StorefrontConfig;
use digital_mart_storefront::models::NewProduct;
use digital_mart_storefront::routes;
use digital_mart_storefront::state::AppState;

/// Password used by every test account.
pub const PASSWORD: &str = "hunter22";

/// A storefront wired to fresh in-memory backends.
pub struct TestApp {
    router: Router,
    state: AppState,
    pub store: MemoryDocumentStore,
    pub identity: MemoryIdentityProvider,
}

impl TestApp {
    /// An empty storefront.
    #[must_use]
    pub fn new() -> Self {
        let store = MemoryDocumentStore::new();
        let identity = MemoryIdentityProvider::new().with_fast_hashing();
        let state = AppState::new(
            StorefrontConfig::default(),
            Arc::new(store.clone()),
            Arc::new(identity.clone()),
        );
        Self {
            router: routes::app(state.clone()),
            state,
            store,
            identity,
        }
    }

    /// A storefront with a small catalog. Returns the product ids by name.
    pub async fn seeded() -> (Self, Catalog) {
        let app = Self::new();
        let catalog = Catalog {
            lamp: app.add_product("Desk Lamp", 1000, Category::Home).await,
            earbuds: app.add_product("Earbuds", 500, Category::Electronics).await,
            phone: app.add_product("Phone", 69_900, Category::Electronics).await,
            jacket: app.add_product("Rain Jacket", 8_950, Category::Fashion).await,
        };
        (app, catalog)
    }

    /// Add a product directly through the product writer.
    pub async fn add_product(&self, name: &str, cents: u32, category: Category) -> ProductId {
        self.state
            .products()
            .add_product(NewProduct {
                name: name.to_string(),
                price: Price::from_cents(cents),
                category,
                image: format!("https://img.example/{cents}.png"),
                description: format!("{name} description"),
                stock: None,
                rating: None,
            })
            .await
            .unwrap()
    }

    /// Send a request and decode the JSON response body (`Null` if empty).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, token, Some(body)).await
    }

    /// Register an account and return its bearer token.
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({"email": email, "password": PASSWORD, "name": "Shopper"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Product ids of the [`TestApp::seeded`] catalog.
pub struct Catalog {
    pub lamp: ProductId,
    pub earbuds: ProductId,
    pub phone: ProductId,
    pub jacket: ProductId,
}

/// Product names of a listing response, in order.
#[must_use]
pub fn names(listing: &Value) -> Vec<String> {
    listing
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}
