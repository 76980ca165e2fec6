//! In-memory backends for development and tests.
//!
//! Both implementations are `Clone` (shared `Arc` state) and `Send + Sync`,
//! so one instance can sit behind the HTTP server while tests keep a handle
//! to inspect what was written.

mod identity;
mod store;

pub use identity::MemoryIdentityProvider;
pub use store::MemoryDocumentStore;
