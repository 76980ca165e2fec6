//! Digital Mart storefront library.
//!
//! The storefront HTTP service, its backend abstraction and the view-state
//! controller, provided as a library so they can be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod view;
