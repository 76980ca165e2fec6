//! Cart route handlers.
//!
//! Every cart endpoint acts on the signed-in user's cart and answers with the
//! full [`CartView`], so the client never has to merge partial updates.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use digital_mart_core::ProductId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CartItem, CartLine, CartSummary};
use crate::state::AppState;

/// Cart display data: the persisted lines, the lines joined with their
/// products, and the order summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub items: Vec<CartItem>,
    pub summary: CartSummary,
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub product_id: ProductId,
}

/// Join cart lines with their products and compute the summary.
///
/// Lines whose product no longer exists are left out of `items` and the
/// summary, but still reported in `lines`.
async fn cart_view(state: &AppState, lines: Vec<CartLine>) -> Result<CartView> {
    let mut products = Vec::with_capacity(lines.len());
    for line in &lines {
        if let Some(product) = state.catalog().get_product(&line.product_id).await? {
            products.push(product);
        }
    }

    let items = CartItem::join(&lines, &products);
    let summary = CartSummary::compute(&items, state.config().tax_rate);
    Ok(CartView {
        lines,
        items,
        summary,
    })
}

/// The signed-in user's cart.
#[instrument(skip_all, fields(user_id = %auth.user.uid))]
pub async fn show(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<CartView>> {
    let lines = state.carts().get_cart(&auth.user.uid).await?;
    Ok(Json(cart_view(&state, lines).await?))
}

/// Add units of a product.
#[instrument(skip_all, fields(user_id = %auth.user.uid, product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<AddRequest>,
) -> Result<Json<CartView>> {
    let lines = state
        .carts()
        .add_to_cart(&auth.user.uid, &body.product_id, body.quantity)
        .await?;
    Ok(Json(cart_view(&state, lines).await?))
}

/// Overwrite a line's quantity; zero or less removes it.
#[instrument(skip_all, fields(user_id = %auth.user.uid, product_id = %body.product_id))]
pub async fn update(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<CartView>> {
    let lines = state
        .carts()
        .set_quantity(&auth.user.uid, &body.product_id, body.quantity)
        .await?;
    Ok(Json(cart_view(&state, lines).await?))
}

/// Remove a product's line.
#[instrument(skip_all, fields(user_id = %auth.user.uid, product_id = %body.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<RemoveRequest>,
) -> Result<Json<CartView>> {
    let lines = state
        .carts()
        .remove_from_cart(&auth.user.uid, &body.product_id)
        .await?;
    Ok(Json(cart_view(&state, lines).await?))
}

/// Checkout. There is no payment flow; the cart is left as it is.
#[instrument(skip_all, fields(user_id = %auth.user.uid))]
pub async fn checkout(auth: RequireAuth) -> StatusCode {
    info!("Checkout requested");
    StatusCode::NO_CONTENT
}
