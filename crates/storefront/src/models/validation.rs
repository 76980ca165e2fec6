//! Input validation errors.

use thiserror::Error;

use digital_mart_core::{CategoryError, PriceError};

/// Malformed user input (add-product form, catalog filters).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required form field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The price is not a number between zero and `Price::MAX`.
    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// The category is not one of the catalog categories.
    #[error("invalid category: {0}")]
    InvalidCategory(#[from] CategoryError),

    /// A numeric field other than price is malformed.
    #[error("invalid {field}: '{value}'")]
    InvalidNumber {
        /// Field name as shown on the form.
        field: &'static str,
        /// The rejected input.
        value: String,
    },
}
