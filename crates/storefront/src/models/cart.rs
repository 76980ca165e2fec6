//! Cart value type and derived cart views.
//!
//! [`Cart`] holds the merge rules: one line per product, quantities above
//! zero, insertion order preserved. The cart store reads a [`Cart`], applies
//! one of these operations, and writes the whole array back.

use rust_decimal::Decimal;
use serde::Serialize;

use digital_mart_core::{Price, ProductId};

use super::{CartLine, Product};

/// Tax rate applied to the cart subtotal unless configured otherwise.
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Most units of one product a cart line can hold. Larger quantities are
/// clamped to it.
pub const MAX_LINE_QUANTITY: u32 = 9_999;

/// A user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Build a cart from stored lines, restoring the invariants.
    ///
    /// Duplicate product lines are folded into the first occurrence and
    /// zero-quantity lines are dropped.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::default();
        for line in lines {
            if line.quantity > 0 {
                cart.add(&line.product_id, line.quantity);
            }
        }
        cart
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Quantity of a product, 0 if absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|l| &l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Total number of units.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        unit_count(self.lines.iter().map(|l| l.quantity))
    }

    /// Increment a product's line, appending it if absent.
    ///
    /// A zero quantity changes nothing. The line is capped at
    /// [`MAX_LINE_QUANTITY`]. Returns whether the cart changed.
    pub fn add(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        match self.lines.iter_mut().find(|l| &l.product_id == product_id) {
            Some(line) => {
                let before = line.quantity;
                line.quantity = before.saturating_add(quantity).min(MAX_LINE_QUANTITY);
                line.quantity != before
            }
            None => {
                self.lines.push(CartLine {
                    product_id: product_id.clone(),
                    quantity: quantity.min(MAX_LINE_QUANTITY),
                });
                true
            }
        }
    }

    /// Drop a product's line. Returns whether it was present.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        self.lines.len() != before
    }

    /// Overwrite a product's quantity.
    ///
    /// A quantity of 0 removes the line. A product that is not in the cart
    /// is left out: this only edits existing lines. Returns whether the cart
    /// changed.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        let quantity = quantity.min(MAX_LINE_QUANTITY);
        match self.lines.iter_mut().find(|l| &l.product_id == product_id) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                true
            }
            _ => false,
        }
    }
}

/// A cart line joined with its product, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Join cart lines with the loaded catalog.
    ///
    /// Lines whose product is not in `products` are skipped.
    #[must_use]
    pub fn join(lines: &[CartLine], products: &[Product]) -> Vec<Self> {
        lines
            .iter()
            .filter_map(|line| {
                products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|product| Self {
                        product: product.clone(),
                        quantity: line.quantity,
                    })
            })
            .collect()
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.line_total(self.quantity)
    }
}

/// Order summary derived from the cart items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl CartSummary {
    /// Compute totals. Subtotal is rounded to cents first, tax and total
    /// are computed from the rounded subtotal.
    #[must_use]
    pub fn compute(items: &[CartItem], tax_rate: Decimal) -> Self {
        let subtotal = cents(
            items
                .iter()
                .map(CartItem::line_total)
                .fold(Decimal::ZERO, Decimal::saturating_add),
        );
        let tax = subtotal.saturating_mul(tax_rate);
        Self {
            item_count: unit_count(items.iter().map(|i| i.quantity)),
            subtotal,
            tax: cents(tax),
            total: cents(subtotal.saturating_add(tax)),
        }
    }

    /// `$25.00`-style subtotal.
    #[must_use]
    pub fn subtotal_display(&self) -> String {
        Price::format_amount(self.subtotal)
    }

    /// `$2.50`-style tax.
    #[must_use]
    pub fn tax_display(&self) -> String {
        Price::format_amount(self.tax)
    }

    /// `$27.50`-style total.
    #[must_use]
    pub fn total_display(&self) -> String {
        Price::format_amount(self.total)
    }
}

/// Sum of unit counts, saturating at `u32::MAX`.
pub(crate) fn unit_count(quantities: impl Iterator<Item = u32>) -> u32 {
    quantities.fold(0, u32::saturating_add)
}

/// Round to cents, keeping two decimal places so totals serialize as `"25.00"`.
fn cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded
}
