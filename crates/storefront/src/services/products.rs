//! Catalog writes (the add-product screen).

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use digital_mart_core::ProductId;

use crate::backend::{BackendError, DocumentStore, collections, to_fields};
use crate::models::NewProduct;
use crate::models::product::{DEFAULT_RATING, DEFAULT_STOCK};

/// Adds products to the catalog.
///
/// Any signed-in user may add products; there is no admin role.
#[derive(Clone)]
pub struct ProductAdmin {
    store: Arc<dyn DocumentStore>,
}

impl ProductAdmin {
    /// Create a product writer over the document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Insert a product under a generated id and return the id.
    ///
    /// Missing `stock` and `rating` default to 10 and 4.5.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the write fails.
    #[instrument(skip_all, fields(name = %product.name, category = %product.category))]
    pub async fn add_product(&self, product: NewProduct) -> Result<ProductId, BackendError> {
        let document = serde_json::json!({
            "name": product.name,
            "price": product.price,
            "category": product.category,
            "image": product.image,
            "description": product.description,
            "stock": product.stock.unwrap_or(DEFAULT_STOCK),
            "rating": product.rating.unwrap_or(DEFAULT_RATING),
            "createdAt": Utc::now(),
        });

        let id = self
            .store
            .add(collections::PRODUCTS, to_fields(&document)?)
            .await?;
        info!(product_id = %id, "Product added");
        Ok(ProductId::new(id))
    }
}
