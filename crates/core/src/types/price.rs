//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored in documents as plain JSON numbers (the managed backend
//! has no decimal type), but all arithmetic happens on [`Decimal`] so that
//! `10.00 * 2 + 5.00` is exactly `25.00`.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when coercing user input into a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a number.
    #[error("price must be a number (got '{0}')")]
    NotNumeric(String),
    /// The input is a number below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The input is above [`Price::MAX`].
    #[error("price cannot exceed {}", Price::MAX)]
    TooLarge,
}

/// A non-negative price in the store currency (USD).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Highest accepted price, one million.
    pub const MAX: Self = Self(Decimal::from_parts(1_000_000, 0, 0, false, 0));

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero, or
    /// `PriceError::TooLarge` if it is above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount.normalize()))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Coerce a form value (e.g. `"19.99"`) into a price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotNumeric` if the trimmed input is not a decimal
    /// number, `PriceError::Negative` if it is below zero, or
    /// `PriceError::TooLarge` if it is above [`Price::MAX`].
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let trimmed = input.trim();
        let amount = Decimal::from_str(trimmed)
            .map_err(|_| PriceError::NotNumeric(trimmed.to_owned()))?;
        Self::new(amount)
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Price multiplied by a quantity, saturating at `Decimal::MAX`.
    ///
    /// Stored documents are not re-validated on read, so the amount may be
    /// above [`Price::MAX`].
    #[must_use]
    pub fn line_total(self, quantity: u32) -> Decimal {
        self.0.saturating_mul(Decimal::from(quantity))
    }

    /// Lossy conversion used for backend range predicates.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Format an arbitrary amount the way prices are displayed (`$25.00`).
    #[must_use]
    pub fn format_amount(amount: Decimal) -> String {
        format!("${:.2}", amount.round_dp(2))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::format_amount(self.0))
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
