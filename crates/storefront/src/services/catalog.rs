//! Catalog reads.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use digital_mart_core::ProductId;

use crate::backend::{BackendError, Direction, Document, DocumentStore, Query, collections};
use crate::models::{Product, ProductFilters};

/// Read-only access to the product catalog.
#[derive(Clone)]
pub struct CatalogReader {
    store: Arc<dyn DocumentStore>,
}

impl CatalogReader {
    /// Create a reader over the document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// List products matching `filters`, ordered by name.
    ///
    /// Category and price bounds run as backend predicates; the name search
    /// is applied to the returned page in memory. Documents that do not
    /// decode as products are skipped.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filters: &ProductFilters,
    ) -> Result<Vec<Product>, BackendError> {
        let documents = self
            .store
            .query(collections::PRODUCTS, &backend_query(filters))
            .await?;
        let fetched = documents.len();

        let products: Vec<Product> = documents
            .iter()
            .filter_map(decode_product)
            .filter(|p| filters.matches_search(p))
            .collect();

        debug!(fetched, returned = products.len(), "Listed products");
        Ok(products)
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the read fails or the document is malformed.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError> {
        self.store
            .get(collections::PRODUCTS, id.as_str())
            .await?
            .map(|doc| doc.decode_with_id())
            .transpose()
    }
}

/// Translate filters into the backend query.
fn backend_query(filters: &ProductFilters) -> Query {
    let mut query = Query::new();
    if let Some(category) = filters.category {
        query = query.where_eq("category", category.as_str());
    }
    if let Some(min) = filters.min_price {
        query = query.where_gte("price", min.as_f64());
    }
    if let Some(max) = filters.max_price {
        query = query.where_lte("price", max.as_f64());
    }
    query.order_by("name", Direction::Ascending)
}

fn decode_product(doc: &Document) -> Option<Product> {
    match doc.decode_with_id() {
        Ok(product) => Some(product),
        Err(e) => {
            warn!(product_id = %doc.id, error = %e, "Skipping malformed product document");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use digital_mart_core::{Category, Price};
    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryDocumentStore;
    use crate::backend::to_fields;

    async fn seeded() -> (CatalogReader, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new();
        let rows = [
            ("Tablet", 300.0, "Electronics"),
            ("Desk Lamp", 45.5, "Home"),
            ("Phone", 599.99, "Electronics"),
            ("Phone Case", 19.99, "Electronics"),
            ("Jacket", 120.0, "Fashion"),
        ];
        for (name, price, category) in rows {
            store
                .add(
                    collections::PRODUCTS,
                    to_fields(&json!({
                        "name": name,
                        "price": price,
                        "category": category,
                        "image": "https://img.example/p.png",
                        "description": name,
                        "stock": 10,
                        "rating": 4.5,
                    }))
                    .unwrap(),
                )
                .await
                .unwrap();
        }
        (CatalogReader::new(Arc::new(store.clone())), store)
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty_filters_return_whole_catalog_by_name() {
        let (catalog, _) = seeded().await;
        let all = catalog
            .list_products(&ProductFilters::default())
            .await
            .unwrap();
        assert_eq!(
            names(&all),
            ["Desk Lamp", "Jacket", "Phone", "Phone Case", "Tablet"]
        );
    }

    #[tokio::test]
    async fn test_filters_compose() {
        let (catalog, _) = seeded().await;
        let filters = ProductFilters {
            category: Some(Category::Electronics),
            min_price: Some(Price::from_cents(5_000)),
            max_price: None,
            search: Some("PHONE".to_string()),
        };
        let found = catalog.list_products(&filters).await.unwrap();
        assert_eq!(names(&found), ["Phone"]);
    }

    #[tokio::test]
    async fn test_backend_query_agrees_with_in_memory_filter() {
        let (catalog, _) = seeded().await;
        let all = catalog
            .list_products(&ProductFilters::default())
            .await
            .unwrap();

        let cases = [
            ProductFilters::parse(Some("Electronics"), None, None, None).unwrap(),
            ProductFilters::parse(Some("all"), Some("40"), Some("300"), None).unwrap(),
            ProductFilters::parse(None, None, Some("45.50"), Some("a")).unwrap(),
            ProductFilters::parse(Some("Home"), Some("100"), None, None).unwrap(),
        ];
        for filters in cases {
            let listed = catalog.list_products(&filters).await.unwrap();
            let expected: Vec<Product> =
                all.iter().filter(|p| filters.matches(p)).cloned().collect();
            assert_eq!(listed, expected, "filters: {filters:?}");
        }
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let (catalog, store) = seeded().await;
        store
            .add(
                collections::PRODUCTS,
                to_fields(&json!({"name": "Broken", "price": "n/a"})).unwrap(),
            )
            .await
            .unwrap();

        let all = catalog
            .list_products(&ProductFilters::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_get_product() {
        let (catalog, store) = seeded().await;
        let id = store
            .add(
                collections::PRODUCTS,
                to_fields(&json!({"name": "Mug", "price": 8, "category": "Home"})).unwrap(),
            )
            .await
            .unwrap();

        let mug = catalog
            .get_product(&ProductId::new(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mug.price, Price::from_cents(800));
        assert_eq!(mug.stock, 0);

        let missing = catalog.get_product(&ProductId::new("nope")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces() {
        let (catalog, store) = seeded().await;
        store.set_offline(true);
        let err = catalog
            .list_products(&ProductFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
