//! Application state for a storefront client.
//!
//! The whole screen is one [`ViewState`] value. It only changes through
//! [`reduce`], a pure function from the current state and an [`Action`] to
//! the next state. The [`Storefront`] controller performs the remote calls
//! and feeds their outcomes back in as actions.
//!
//! Remote results can arrive out of order. Each request takes a [`Ticket`]
//! for its slot (products or cart); a result whose ticket is not the latest
//! one issued for that slot is dropped.

mod controller;

pub use controller::Storefront;

use rust_decimal::Decimal;

use crate::models::cart::{DEFAULT_TAX_RATE, unit_count};
use crate::models::{CartItem, CartLine, CartSummary, Product, ProductFilters, SessionUser};

/// Screens of the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Login,
    Products,
    Cart,
    AddProduct,
}

impl View {
    /// Whether the screen needs a signed-in user.
    #[must_use]
    pub const fn requires_user(self) -> bool {
        !matches!(self, Self::Login)
    }
}

/// Sequence number of a remote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Ticket(u64);

/// Latest ticket issued per request slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tickets {
    issued: u64,
    products: Ticket,
    cart: Ticket,
}

impl Tickets {
    /// Latest products request.
    #[must_use]
    pub const fn products(&self) -> Ticket {
        self.products
    }

    /// Latest cart request.
    #[must_use]
    pub const fn cart(&self) -> Ticket {
        self.cart
    }

    const fn next(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }
}

/// Everything the storefront screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub view: View,
    pub user: Option<SessionUser>,
    pub cart_lines: Vec<CartLine>,
    pub products: Vec<Product>,
    pub filters: ProductFilters,
    pub loading: bool,
    /// Message of the last failed action, until the next successful one.
    pub error: Option<String>,
    pub pending: Tickets,
    pub tax_rate: Decimal,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_TAX_RATE)
    }
}

impl ViewState {
    /// Signed-out state on the login screen.
    #[must_use]
    pub fn new(tax_rate: Decimal) -> Self {
        Self {
            view: View::Login,
            user: None,
            cart_lines: Vec::new(),
            products: Vec::new(),
            filters: ProductFilters::default(),
            loading: false,
            error: None,
            pending: Tickets::default(),
            tax_rate,
        }
    }

    /// Cart lines joined with the loaded products.
    #[must_use]
    pub fn cart_items(&self) -> Vec<CartItem> {
        CartItem::join(&self.cart_lines, &self.products)
    }

    /// Totals of [`cart_items`](Self::cart_items).
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::compute(&self.cart_items(), self.tax_rate)
    }

    /// Units in the cart, for the header badge.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        unit_count(self.cart_lines.iter().map(|l| l.quantity))
    }
}

/// State transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The identity provider reported a sign-in, refresh or sign-out.
    IdentityChanged(Option<SessionUser>),
    Navigate(View),
    SetFilters(ProductFilters),
    /// A products request was sent; issues a new products ticket.
    ProductsRequested,
    ProductsLoaded {
        ticket: Ticket,
        products: Vec<Product>,
    },
    ProductsFailed {
        ticket: Ticket,
        message: String,
    },
    /// A cart request was sent; issues a new cart ticket.
    CartRequested,
    CartLoaded {
        ticket: Ticket,
        lines: Vec<CartLine>,
    },
    CartFailed {
        ticket: Ticket,
        message: String,
    },
    /// An action without a result slot failed (sign-in, add product...).
    Failed(String),
    /// Clear the error message.
    DismissError,
}

/// Compute the next state.
#[must_use]
pub fn reduce(mut state: ViewState, action: Action) -> ViewState {
    match action {
        Action::IdentityChanged(Some(user)) => {
            let switched = state.user.as_ref().is_none_or(|u| u.uid != user.uid);
            if switched {
                state.cart_lines.clear();
                state.view = View::Products;
            }
            state.user = Some(user);
            state.error = None;
        }
        Action::IdentityChanged(None) => {
            state.user = None;
            state.cart_lines.clear();
            state.view = View::Login;
            state.loading = false;
        }
        Action::Navigate(view) => {
            state.view = if view.requires_user() && state.user.is_none() {
                View::Login
            } else {
                view
            };
            state.error = None;
        }
        Action::SetFilters(filters) => state.filters = filters,
        Action::ProductsRequested => {
            state.pending.products = state.pending.next();
            state.loading = true;
        }
        Action::ProductsLoaded { ticket, products } => {
            if ticket == state.pending.products {
                state.products = products;
                state.loading = false;
                state.error = None;
            }
        }
        Action::ProductsFailed { ticket, message } => {
            if ticket == state.pending.products {
                state.products.clear();
                state.loading = false;
                state.error = Some(message);
            }
        }
        Action::CartRequested => state.pending.cart = state.pending.next(),
        Action::CartLoaded { ticket, lines } => {
            if ticket == state.pending.cart {
                state.cart_lines = lines;
                state.error = None;
            }
        }
        Action::CartFailed { ticket, message } => {
            if ticket == state.pending.cart {
                state.error = Some(message);
            }
        }
        Action::Failed(message) => {
            state.loading = false;
            state.error = Some(message);
        }
        Action::DismissError => state.error = None,
    }
    state
}
