//! Per-user cart persistence.
//!
//! The cart lives in the `cart` array of the user record. Every mutation is
//! a read-modify-write of the whole array, guarded by the document version:
//! the write only lands if nobody else wrote the record in between, and a
//! conflicting attempt starts over from a fresh read.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use digital_mart_core::{ProductId, UserId};

use crate::backend::{BackendError, DocumentStore, Fields, collections};
use crate::models::cart::MAX_LINE_QUANTITY;
use crate::models::{Cart, CartLine};

/// Cart store over the user records.
#[derive(Clone)]
pub struct CartStore {
    store: Arc<dyn DocumentStore>,
}

impl CartStore {
    /// Attempts per mutation before giving up with `BackendError::Contention`.
    pub const MAX_ATTEMPTS: u32 = 5;

    /// Create a cart store over the document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read a user's cart.
    ///
    /// A user without a record gets one, holding an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend read or write fails.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, BackendError> {
        let (version, cart) = self.read(user_id).await?;
        if version > 0 {
            return Ok(cart.into_lines());
        }

        let mut fields = Fields::new();
        fields.insert("cart".to_owned(), Value::Array(Vec::new()));
        fields.insert("createdAt".to_owned(), serde_json::to_value(Utc::now())?);
        match self
            .store
            .merge_if_version(collections::USERS, user_id.as_str(), 0, fields)
            .await
        {
            Ok(_) => {
                debug!("Created user record with an empty cart");
                Ok(Vec::new())
            }
            // Someone else created the record first; theirs wins.
            Err(BackendError::VersionConflict { .. }) => {
                self.read(user_id).await.map(|(_, cart)| cart.into_lines())
            }
            Err(e) => Err(e),
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// A quantity of zero or less returns the current cart without writing.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend fails, or
    /// `BackendError::Contention` if every attempt conflicted.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id, quantity))]
    pub async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Vec<CartLine>, BackendError> {
        let Some(quantity) = positive(quantity) else {
            return self.read(user_id).await.map(|(_, cart)| cart.into_lines());
        };
        self.mutate(user_id, |cart| {
            cart.add(product_id, quantity);
        })
        .await
    }

    /// Remove a product's line. Removing an absent product changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend fails, or
    /// `BackendError::Contention` if every attempt conflicted.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Vec<CartLine>, BackendError> {
        self.mutate(user_id, |cart| {
            cart.remove(product_id);
        })
        .await
    }

    /// Set the quantity of a product already in the cart.
    ///
    /// Zero or less removes the line. A product that is not in the cart is
    /// not added.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend fails, or
    /// `BackendError::Contention` if every attempt conflicted.
    #[instrument(skip_all, fields(user_id = %user_id, product_id = %product_id, quantity))]
    pub async fn set_quantity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Vec<CartLine>, BackendError> {
        let quantity = positive(quantity).unwrap_or(0);
        self.mutate(user_id, |cart| {
            cart.set_quantity(product_id, quantity);
        })
        .await
    }

    async fn read(&self, user_id: &UserId) -> Result<(u64, Cart), BackendError> {
        let Some(doc) = self.store.get(collections::USERS, user_id.as_str()).await? else {
            return Ok((0, Cart::default()));
        };
        let lines: Vec<CartLine> = doc.field("cart")?.unwrap_or_default();
        Ok((doc.version, Cart::from_lines(lines)))
    }

    /// Read, apply `edit`, write back if the record is unchanged; retry on
    /// conflict.
    async fn mutate<F>(&self, user_id: &UserId, edit: F) -> Result<Vec<CartLine>, BackendError>
    where
        F: Fn(&mut Cart) + Send + Sync,
    {
        for attempt in 1..=Self::MAX_ATTEMPTS {
            let (version, mut cart) = self.read(user_id).await?;
            edit(&mut cart);

            let now = serde_json::to_value(Utc::now())?;
            let mut fields = Fields::new();
            fields.insert("cart".to_owned(), serde_json::to_value(cart.lines())?);
            fields.insert("lastUpdated".to_owned(), now.clone());
            if version == 0 {
                fields.insert("createdAt".to_owned(), now);
            }

            match self
                .store
                .merge_if_version(collections::USERS, user_id.as_str(), version, fields)
                .await
            {
                Ok(_) => {
                    debug!(attempt, lines = cart.lines().len(), "Cart saved");
                    return Ok(cart.into_lines());
                }
                Err(BackendError::VersionConflict { actual, .. }) => {
                    warn!(attempt, read = version, actual, "Cart write conflicted, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(BackendError::Contention {
            collection: collections::USERS.to_owned(),
            id: user_id.to_string(),
            attempts: Self::MAX_ATTEMPTS,
        })
    }
}

/// `quantity` as a unit count if it is above zero, capped at
/// [`MAX_LINE_QUANTITY`].
fn positive(quantity: i64) -> Option<u32> {
    if quantity <= 0 {
        return None;
    }
    Some(u32::try_from(quantity).map_or(MAX_LINE_QUANTITY, |q| q.min(MAX_LINE_QUANTITY)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryDocumentStore;
    use crate::backend::{Document, Query, to_fields};

    fn uid() -> UserId {
        UserId::new("u1")
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn carts() -> (CartStore, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new();
        (CartStore::new(Arc::new(store.clone())), store)
    }

    async fn seed_record(store: &MemoryDocumentStore, value: serde_json::Value) {
        store
            .set(collections::USERS, "u1", to_fields(&value).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_cart_creates_missing_record() {
        let (carts, store) = carts();
        assert!(carts.get_cart(&uid()).await.unwrap().is_empty());

        let doc = store.get(collections::USERS, "u1").await.unwrap().unwrap();
        assert_eq!(doc.fields.get("cart"), Some(&json!([])));
        assert!(doc.fields.contains_key("createdAt"));

        // Second read does not write again.
        let writes = store.write_count();
        carts.get_cart(&uid()).await.unwrap();
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_huge_quantities_are_capped() {
        let (carts, _) = carts();
        carts.add_to_cart(&uid(), &pid("A"), i64::MAX).await.unwrap();
        carts.add_to_cart(&uid(), &pid("A"), 1).await.unwrap();
        let cart = carts
            .add_to_cart(&uid(), &pid("B"), i64::from(u32::MAX))
            .await
            .unwrap();
        assert_eq!(
            cart,
            [
                CartLine::new("A", MAX_LINE_QUANTITY),
                CartLine::new("B", MAX_LINE_QUANTITY)
            ]
        );

        let cart = carts.set_quantity(&uid(), &pid("B"), i64::MAX).await.unwrap();
        assert_eq!(Cart::from_lines(cart).quantity_of(&pid("B")), MAX_LINE_QUANTITY);
    }

    #[tokio::test]
    async fn test_add_increments_and_appends() {
        let (carts, _) = carts();
        carts.add_to_cart(&uid(), &pid("A"), 2).await.unwrap();
        carts.add_to_cart(&uid(), &pid("B"), 1).await.unwrap();
        let cart = carts.add_to_cart(&uid(), &pid("A"), 3).await.unwrap();

        assert_eq!(cart, [CartLine::new("A", 5), CartLine::new("B", 1)]);
        assert_eq!(carts.get_cart(&uid()).await.unwrap(), cart);
    }

    #[tokio::test]
    async fn test_non_positive_add_does_not_write() {
        let (carts, store) = carts();
        carts.add_to_cart(&uid(), &pid("A"), 2).await.unwrap();
        let writes = store.write_count();

        let zero = carts.add_to_cart(&uid(), &pid("A"), 0).await.unwrap();
        let negative = carts.add_to_cart(&uid(), &pid("B"), -3).await.unwrap();

        assert_eq!(zero, [CartLine::new("A", 2)]);
        assert_eq!(negative, zero);
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_add_preserves_other_fields() {
        let (carts, store) = carts();
        seed_record(
            &store,
            json!({
                "email": "ann@shop.io",
                "name": "Ann",
                "cart": [{"productId": "A", "quantity": 2}],
                "wishlist": ["W"],
                "createdAt": "2024-01-01T00:00:00Z",
            }),
        )
        .await;

        let cart = carts.add_to_cart(&uid(), &pid("A"), 1).await.unwrap();
        assert_eq!(cart, [CartLine::new("A", 3)]);

        let doc = store.get(collections::USERS, "u1").await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], json!("Ann"));
        assert_eq!(doc.fields["wishlist"], json!(["W"]));
        assert_eq!(doc.fields["createdAt"], json!("2024-01-01T00:00:00Z"));
        assert!(doc.fields.contains_key("lastUpdated"));
    }

    #[tokio::test]
    async fn test_add_to_new_user_creates_record() {
        let (carts, store) = carts();
        carts.add_to_cart(&uid(), &pid("A"), 1).await.unwrap();

        let doc = store.get(collections::USERS, "u1").await.unwrap().unwrap();
        assert_eq!(doc.fields["cart"], json!([{"productId": "A", "quantity": 1}]));
        assert!(doc.fields.contains_key("createdAt"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (carts, _) = carts();
        carts.add_to_cart(&uid(), &pid("A"), 2).await.unwrap();
        carts.add_to_cart(&uid(), &pid("B"), 1).await.unwrap();

        let once = carts.remove_from_cart(&uid(), &pid("A")).await.unwrap();
        let twice = carts.remove_from_cart(&uid(), &pid("A")).await.unwrap();
        assert_eq!(once, [CartLine::new("B", 1)]);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_set_quantity() {
        let (carts, _) = carts();
        carts.add_to_cart(&uid(), &pid("A"), 2).await.unwrap();
        carts.add_to_cart(&uid(), &pid("B"), 1).await.unwrap();

        let set = carts.set_quantity(&uid(), &pid("A"), 7).await.unwrap();
        assert_eq!(set, [CartLine::new("A", 7), CartLine::new("B", 1)]);

        let absent = carts.set_quantity(&uid(), &pid("C"), 4).await.unwrap();
        assert_eq!(absent, set);

        let removed = carts.set_quantity(&uid(), &pid("A"), 0).await.unwrap();
        assert_eq!(removed, [CartLine::new("B", 1)]);

        let negative = carts.set_quantity(&uid(), &pid("B"), -1).await.unwrap();
        assert!(negative.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_increments_both_land() {
        let store = MemoryDocumentStore::new().with_suspension();
        let carts = CartStore::new(Arc::new(store.clone()));
        let (user, lamp) = (uid(), pid("A"));
        carts.get_cart(&user).await.unwrap();

        let (a, b) = tokio::join!(
            carts.add_to_cart(&user, &lamp, 1),
            carts.add_to_cart(&user, &lamp, 1),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(carts.get_cart(&uid()).await.unwrap(), [CartLine::new("A", 2)]);
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_different_products_both_land() {
        let store = MemoryDocumentStore::new().with_suspension();
        let carts = CartStore::new(Arc::new(store.clone()));

        let (user, a_id, b_id) = (uid(), pid("A"), pid("B"));

        let (a, b, c) = tokio::join!(
            carts.add_to_cart(&user, &a_id, 1),
            carts.add_to_cart(&user, &b_id, 2),
            carts.add_to_cart(&user, &a_id, 3),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        let cart = Cart::from_lines(carts.get_cart(&uid()).await.unwrap());
        assert_eq!(cart.quantity_of(&pid("A")), 4);
        assert_eq!(cart.quantity_of(&pid("B")), 2);
    }

    /// Store whose conditional writes always lose.
    struct AlwaysConflicting(MemoryDocumentStore);

    #[async_trait]
    impl DocumentStore for AlwaysConflicting {
        async fn get(&self, c: &str, id: &str) -> Result<Option<Document>, BackendError> {
            self.0.get(c, id).await
        }
        async fn set(&self, c: &str, id: &str, f: Fields) -> Result<u64, BackendError> {
            self.0.set(c, id, f).await
        }
        async fn merge(&self, c: &str, id: &str, f: Fields) -> Result<u64, BackendError> {
            self.0.merge(c, id, f).await
        }
        async fn merge_if_version(
            &self,
            c: &str,
            id: &str,
            expected: u64,
            _: Fields,
        ) -> Result<u64, BackendError> {
            Err(BackendError::VersionConflict {
                collection: c.to_owned(),
                id: id.to_owned(),
                expected,
                actual: expected + 1,
            })
        }
        async fn update(&self, c: &str, id: &str, f: Fields) -> Result<u64, BackendError> {
            self.0.update(c, id, f).await
        }
        async fn add(&self, c: &str, f: Fields) -> Result<String, BackendError> {
            self.0.add(c, f).await
        }
        async fn query(&self, c: &str, q: &Query) -> Result<Vec<Document>, BackendError> {
            self.0.query(c, q).await
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let carts = CartStore::new(Arc::new(AlwaysConflicting(MemoryDocumentStore::new())));
        let err = carts.add_to_cart(&uid(), &pid("A"), 1).await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Contention { attempts, .. } if attempts == CartStore::MAX_ATTEMPTS
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_retried() {
        let (carts, store) = carts();
        store.set_offline(true);
        let err = carts.add_to_cart(&uid(), &pid("A"), 1).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
        assert_eq!(store.write_count(), 0);
    }
}
