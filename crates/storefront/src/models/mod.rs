//! Domain models for the storefront.
//!
//! - [`user`] - the persisted user record and its cart lines
//! - [`product`] - catalog products, the add-product form, catalog filters
//! - [`cart`] - the in-memory cart value and derived cart items/totals
//! - [`session`] - the signed-in identity handed to the view layer
//! - [`validation`] - input validation errors

pub mod cart;
pub mod product;
pub mod session;
pub mod user;
pub mod validation;

pub use cart::{Cart, CartItem, CartSummary};
pub use product::{NewProduct, PriceInput, Product, ProductFilters, ProductForm};
pub use session::{AuthSession, SessionUser};
pub use user::{CartLine, UserRecord};
pub use validation::ValidationError;
