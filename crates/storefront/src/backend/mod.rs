//! Managed backend interfaces: document database and identity provider.
//!
//! # Architecture
//!
//! The storefront owns no storage. Everything it persists lives in a hosted
//! document database, and every identity is issued by a hosted identity
//! provider. This module defines the narrow contract the storefront needs
//! from each of them:
//!
//! - [`DocumentStore`] - collections of JSON documents keyed by string ids,
//!   with get/set/merge/update, generated-id inserts, and single-collection
//!   queries (equality and range predicates plus one order-by).
//! - [`IdentityProvider`] - email/password registration and login, display
//!   names, bearer tokens.
//!
//! Every document carries a `version` that increases on each write. Writers
//! that need read-modify-write safety pass the version they read to
//! [`DocumentStore::merge_if_version`] and retry on
//! [`BackendError::VersionConflict`].
//!
//! # Collections
//!
//! - `users` - keyed by identity id; profile fields plus the `cart` array
//! - `products` - keyed by generated id; the catalog
//!
//! The in-memory implementations in [`memory`] back the binary and the tests.

pub mod document;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use digital_mart_core::{Email, UserId};

use crate::services::auth::AuthError;

pub use document::{Direction, Document, FieldFilter, Fields, FilterOp, Query, to_fields};

/// Collection names.
pub mod collections {
    /// One record per identity, keyed by identity id.
    pub const USERS: &str = "users";
    /// The product catalog.
    pub const PRODUCTS: &str = "products";
}

/// Errors returned by the managed backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached or refused the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The target document does not exist (strict updates only).
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
    },

    /// A conditional write lost against a concurrent writer.
    #[error("version conflict on {collection}/{id} (expected {expected}, found {actual})")]
    VersionConflict {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
        /// Version the writer read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// A read-modify-write kept conflicting and gave up.
    #[error("gave up on {collection}/{id} after {attempts} conflicting attempts")]
    Contention {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// A document could not be converted to or from its typed form.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An in-process lock was poisoned by a panicking writer.
    #[error("backend lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// A document database with partial-merge writes and simple queries.
///
/// Versions start at 1 for a freshly created document; version 0 means
/// "does not exist". Every successful write returns the new version.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError>;

    /// Create or fully replace a document.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<u64, BackendError>;

    /// Upsert: create the document if absent, otherwise overwrite only the
    /// given top-level fields and keep the rest.
    async fn merge(&self, collection: &str, id: &str, fields: Fields)
    -> Result<u64, BackendError>;

    /// Like [`merge`](Self::merge), but only if the stored version still
    /// equals `expected_version` (0 = the document must not exist yet).
    ///
    /// Returns [`BackendError::VersionConflict`] otherwise.
    async fn merge_if_version(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        fields: Fields,
    ) -> Result<u64, BackendError>;

    /// Overwrite the given fields of an existing document.
    ///
    /// Returns [`BackendError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields)
    -> Result<u64, BackendError>;

    /// Insert a new document under a generated id and return the id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, BackendError>;

    /// Run a query over one collection.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, BackendError>;
}

/// An identity as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque identity id.
    pub uid: UserId,
    /// Normalized email the identity signs in with.
    pub email: Email,
    /// Display name, if one was set.
    pub display_name: Option<String>,
}

/// A bearer token issued for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Opaque token value.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Email/password identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new identity.
    ///
    /// Fails with `AuthError::UserAlreadyExists` or `AuthError::WeakPassword`.
    async fn create_user(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;

    /// Set the display name of an identity.
    async fn update_profile(&self, uid: &UserId, display_name: &str)
    -> Result<Identity, AuthError>;

    /// Check credentials. Fails with `AuthError::InvalidCredentials`.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;

    /// Issue a fresh bearer token for an identity.
    async fn issue_token(&self, uid: &UserId) -> Result<IssuedToken, AuthError>;

    /// Resolve a bearer token. Fails with `AuthError::InvalidSession` if the
    /// token is unknown, revoked or expired.
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError>;

    /// Revoke a bearer token. Revoking an unknown token is not an error.
    async fn revoke_token(&self, token: &str) -> Result<(), AuthError>;
}
