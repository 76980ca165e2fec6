//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use digital_mart_core::ProductId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Product, ProductFilters, ProductForm};
use crate::state::AppState;

/// Catalog filter query parameters, as typed into the filter form.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub search: Option<String>,
}

impl ProductQuery {
    /// Parse into catalog filters.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an unknown category or a non-numeric
    /// price bound.
    pub fn filters(&self) -> std::result::Result<ProductFilters, crate::models::ValidationError> {
        ProductFilters::parse(
            self.category.as_deref(),
            self.min_price.as_deref(),
            self.max_price.as_deref(),
            self.search.as_deref(),
        )
    }
}

/// Response body of a successful add.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedProduct {
    pub id: ProductId,
}

/// List products matching the filters, ordered by name.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let filters = query.filters()?;
    let products = state.catalog().list_products(&filters).await?;
    Ok(Json(products))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    state
        .catalog()
        .get_product(&ProductId::new(id.clone()))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Add a product to the catalog.
///
/// Any signed-in user may call this.
#[instrument(skip_all, fields(user_id = %auth.user.uid))]
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<CreatedProduct>)> {
    let product = form.validate()?;
    let id = state.products().add_product(product).await?;
    Ok((StatusCode::CREATED, Json(CreatedProduct { id })))
}
