//! User record domain types.
//!
//! One document per identity in the `users` collection, keyed by identity id.
//! Field names are camelCase so existing documents keep decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use digital_mart_core::{Email, ProductId};

/// A persisted `{productId, quantity}` pair inside a user's cart array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    /// Create a cart line.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// The user record.
///
/// Created at sign-up with every field set. Records created lazily by the
/// cart store only carry `cart` (and `createdAt`), so everything else is
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub cart: Vec<CartLine>,
    #[serde(default)]
    pub wishlist: Vec<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// The record written at sign-up: empty cart and wishlist.
    #[must_use]
    pub fn new_account(email: Email, name: String, now: DateTime<Utc>) -> Self {
        Self {
            email: Some(email),
            name: Some(name),
            cart: Vec::new(),
            wishlist: Vec::new(),
            created_at: Some(now),
            last_updated: None,
        }
    }
}
