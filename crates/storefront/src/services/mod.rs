//! Storefront components built on the managed backend.
//!
//! - [`auth`] - sign-up, sign-in, sign-out, token refresh, identity changes
//! - [`catalog`] - filtered product listing and single-product reads
//! - [`cart`] - the per-user cart array with version-checked writes
//! - [`products`] - adding products to the catalog

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod products;

pub use auth::{AuthError, AuthGateway, IdentitySubscription};
pub use cart::CartStore;
pub use catalog::CatalogReader;
pub use products::ProductAdmin;
