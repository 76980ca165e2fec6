//! Digital Mart Core - Shared domain types.
//!
//! This crate provides the types used across the Digital Mart components:
//! - `storefront` - Auth gateway, catalog reader, cart store and the HTTP surface
//! - `integration-tests` - End-to-end tests against the in-memory backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no backend access,
//! no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for identity ids, product ids, emails, prices and categories

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
