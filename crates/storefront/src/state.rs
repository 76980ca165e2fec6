//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{DocumentStore, IdentityProvider};
use crate::config::StorefrontConfig;
use crate::services::{AuthGateway, CartStore, CatalogReader, ProductAdmin};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// storefront components and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    auth: AuthGateway,
    catalog: CatalogReader,
    carts: CartStore,
    products: ProductAdmin,
}

impl AppState {
    /// Wire the storefront components over a backend.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                auth: AuthGateway::new(identity, Arc::clone(&store)),
                catalog: CatalogReader::new(Arc::clone(&store)),
                carts: CartStore::new(Arc::clone(&store)),
                products: ProductAdmin::new(store),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the authentication gateway.
    #[must_use]
    pub fn auth(&self) -> &AuthGateway {
        &self.inner.auth
    }

    /// Get a reference to the catalog reader.
    #[must_use]
    pub fn catalog(&self) -> &CatalogReader {
        &self.inner.catalog
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// Get a reference to the product writer.
    #[must_use]
    pub fn products(&self) -> &ProductAdmin {
        &self.inner.products
    }
}
