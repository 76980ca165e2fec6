//! Storefront controller.
//!
//! Runs the remote calls behind each shopper action and reduces their
//! outcomes into the [`ViewState`].

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use digital_mart_core::ProductId;

use super::{Action, View, ViewState, reduce};
use crate::backend::{DocumentStore, IdentityProvider};
use crate::error::AppError;
use crate::models::{ProductFilters, ProductForm};
use crate::services::{AuthGateway, CartStore, CatalogReader, IdentitySubscription, ProductAdmin};

/// One shopper's storefront session.
///
/// Owns its own [`AuthGateway`], so the identity stream it follows only
/// carries this shopper's sign-ins and sign-outs. Every failure ends up in
/// [`ViewState::error`]; nothing is retried.
pub struct Storefront {
    state: ViewState,
    auth: AuthGateway,
    identity: IdentitySubscription,
    catalog: CatalogReader,
    carts: CartStore,
    products: ProductAdmin,
    token: Option<String>,
}

impl Storefront {
    /// Create a signed-out storefront over the backends.
    ///
    /// `tax_rate` is applied to the cart subtotal in [`ViewState::summary`].
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        tax_rate: Decimal,
    ) -> Self {
        let auth = AuthGateway::new(identity, Arc::clone(&store));
        let subscription = auth.on_identity_change();
        Self {
            state: ViewState::new(tax_rate),
            auth,
            identity: subscription,
            catalog: CatalogReader::new(Arc::clone(&store)),
            carts: CartStore::new(Arc::clone(&store)),
            products: ProductAdmin::new(store),
            token: None,
        }
    }

    /// The current screen state.
    #[must_use]
    pub const fn state(&self) -> &ViewState {
        &self.state
    }

    /// Bearer token of the signed-in shopper.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    fn fail(&mut self, err: impl Into<AppError>) {
        let err = err.into();
        warn!(error = %err, "Storefront action failed");
        self.dispatch(Action::Failed(err.public_message()));
    }

    /// Apply the gateway's latest identity, then load the shopper's data.
    async fn sync_identity(&mut self) {
        let user = self.identity.current();
        let signed_in = user.is_some();
        self.dispatch(Action::IdentityChanged(user));
        if signed_in {
            self.load_cart().await;
            self.load_products().await;
        }
    }

    /// Sign in. On success the shopper lands on the product listing with
    /// their cart loaded.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&mut self, email: &str, password: &str) {
        match self.auth.sign_in(email, password).await {
            Ok(session) => {
                self.token = Some(session.token);
                self.sync_identity().await;
            }
            Err(e) => self.fail(e),
        }
    }

    /// Create an account and sign it in.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn register(&mut self, email: &str, password: &str, name: &str) {
        match self.auth.sign_up(email, password, name).await {
            Ok(session) => {
                self.token = Some(session.token);
                self.sync_identity().await;
            }
            Err(e) => self.fail(e),
        }
    }

    /// Sign out and return to the login screen. Does nothing when signed out.
    #[instrument(skip_all)]
    pub async fn logout(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        if let Err(e) = self.auth.sign_out(&token).await {
            self.token = Some(token);
            self.fail(e);
            return;
        }
        self.sync_identity().await;
    }

    /// Switch screens, loading what the new screen shows.
    pub async fn navigate(&mut self, view: View) {
        self.dispatch(Action::Navigate(view));
        match self.state.view {
            View::Products => self.load_products().await,
            View::Cart => self.load_cart().await,
            View::Login | View::AddProduct => {}
        }
    }

    /// Replace the catalog filters and reload the listing.
    pub async fn set_filters(&mut self, filters: ProductFilters) {
        self.dispatch(Action::SetFilters(filters));
        if self.state.view == View::Products {
            self.load_products().await;
        }
    }

    /// Fetch the listing for the current filters.
    #[instrument(skip_all)]
    pub async fn load_products(&mut self) {
        self.dispatch(Action::ProductsRequested);
        let ticket = self.state.pending.products();
        match self.catalog.list_products(&self.state.filters).await {
            Ok(products) => self.dispatch(Action::ProductsLoaded { ticket, products }),
            Err(e) => self.dispatch(Action::ProductsFailed {
                ticket,
                message: AppError::from(e).public_message(),
            }),
        }
    }

    /// Fetch the signed-in shopper's cart.
    #[instrument(skip_all)]
    pub async fn load_cart(&mut self) {
        let Some(uid) = self.state.user.as_ref().map(|u| u.uid.clone()) else {
            return;
        };
        self.dispatch(Action::CartRequested);
        let ticket = self.state.pending.cart();
        match self.carts.get_cart(&uid).await {
            Ok(lines) => self.dispatch(Action::CartLoaded { ticket, lines }),
            Err(e) => self.dispatch(Action::CartFailed {
                ticket,
                message: AppError::from(e).public_message(),
            }),
        }
    }

    /// Add units of a product; zero or less changes nothing.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn add_to_cart(&mut self, product_id: &ProductId, quantity: i64) {
        let Some(uid) = self.state.user.as_ref().map(|u| u.uid.clone()) else {
            return;
        };
        self.dispatch(Action::CartRequested);
        let ticket = self.state.pending.cart();
        match self.carts.add_to_cart(&uid, product_id, quantity).await {
            Ok(lines) => self.dispatch(Action::CartLoaded { ticket, lines }),
            Err(e) => self.dispatch(Action::CartFailed {
                ticket,
                message: AppError::from(e).public_message(),
            }),
        }
    }

    /// Drop a product's line.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn remove_from_cart(&mut self, product_id: &ProductId) {
        let Some(uid) = self.state.user.as_ref().map(|u| u.uid.clone()) else {
            return;
        };
        self.dispatch(Action::CartRequested);
        let ticket = self.state.pending.cart();
        match self.carts.remove_from_cart(&uid, product_id).await {
            Ok(lines) => self.dispatch(Action::CartLoaded { ticket, lines }),
            Err(e) => self.dispatch(Action::CartFailed {
                ticket,
                message: AppError::from(e).public_message(),
            }),
        }
    }

    /// Overwrite a line's quantity; zero or less removes it.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        let Some(uid) = self.state.user.as_ref().map(|u| u.uid.clone()) else {
            return;
        };
        self.dispatch(Action::CartRequested);
        let ticket = self.state.pending.cart();
        match self.carts.set_quantity(&uid, product_id, quantity).await {
            Ok(lines) => self.dispatch(Action::CartLoaded { ticket, lines }),
            Err(e) => self.dispatch(Action::CartFailed {
                ticket,
                message: AppError::from(e).public_message(),
            }),
        }
    }

    /// Submit the add-product form. On success the shopper lands on the
    /// refreshed product listing.
    #[instrument(skip_all)]
    pub async fn add_product(&mut self, form: ProductForm) -> Option<ProductId> {
        let product = match form.validate() {
            Ok(product) => product,
            Err(e) => {
                self.fail(e);
                return None;
            }
        };
        match self.products.add_product(product).await {
            Ok(id) => {
                self.navigate(View::Products).await;
                Some(id)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// Checkout has no payment flow; the cart is left untouched.
    pub fn checkout(&self) {
        info!(items = self.state.cart_count(), "Checkout requested");
    }
}
