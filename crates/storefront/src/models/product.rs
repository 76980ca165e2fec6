//! Product domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use digital_mart_core::{Category, Price, ProductId};

use super::ValidationError;

/// Stock assigned to a new product when the form leaves it out.
pub const DEFAULT_STOCK: u32 = 10;

/// Rating assigned to a new product when the form leaves it out.
pub const DEFAULT_RATING: f64 = 4.5;

/// Products with less stock than this show an "only N left" notice.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: Category,
    /// Image URL.
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the add-to-cart action should be disabled.
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }

    /// Whether to show the low-stock notice.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock < LOW_STOCK_THRESHOLD
    }
}

/// A validated product ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub category: Category,
    pub image: String,
    pub description: String,
    pub stock: Option<u32>,
    pub rating: Option<f64>,
}

/// A form value that may arrive as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(serde_json::Number),
    Text(String),
}

impl Default for PriceInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl PriceInput {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// The add-product form as submitted.
///
/// Every field is required except `stock` and `rating`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: PriceInput,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl ProductForm {
    /// Check required fields and coerce the price.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for the first blank required
    /// field, `ValidationError::InvalidPrice` if the price is not a
    /// number between zero and `Price::MAX`, and
    /// `ValidationError::InvalidCategory` for an unknown category.
    pub fn validate(self) -> Result<NewProduct, ValidationError> {
        let name = required("name", self.name)?;
        let price_text = required("price", self.price.as_text())?;
        let category = required("category", self.category)?;
        let image = required("image", self.image)?;
        let description = required("description", self.description)?;

        let price = Price::parse(&price_text)?;
        let category = category.parse::<Category>()?;
        if let Some(rating) = self.rating
            && !rating.is_finite()
        {
            return Err(ValidationError::InvalidNumber {
                field: "rating",
                value: rating.to_string(),
            });
        }

        Ok(NewProduct {
            name,
            price,
            category,
            image,
            description,
            stock: self.stock,
            rating: self.rating,
        })
    }
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_owned())
}

/// Catalog filters.
///
/// All present filters must hold at once. An empty filter set matches the
/// whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    pub category: Option<Category>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
}

impl ProductFilters {
    /// Build filters from raw form values.
    ///
    /// Blank values mean "no filter"; a category of `all` means every category.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an unknown category or a non-numeric
    /// price bound.
    pub fn parse(
        category: Option<&str>,
        min_price: Option<&str>,
        max_price: Option<&str>,
        search: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let category = match category {
            Some(c) => Category::parse_filter(c)?,
            None => None,
        };
        Ok(Self {
            category,
            min_price: parse_bound(min_price)?,
            max_price: parse_bound(max_price)?,
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        })
    }

    /// Whether no filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.search.is_none()
    }

    /// Whether the product name contains the search term (case-insensitive).
    #[must_use]
    pub fn matches_search(&self, product: &Product) -> bool {
        self.search.as_ref().is_none_or(|term| {
            product
                .name
                .to_lowercase()
                .contains(&term.to_lowercase())
        })
    }

    /// Whether a product satisfies every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category.is_none_or(|c| product.category == c)
            && self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
            && self.matches_search(product)
    }
}

fn parse_bound(value: Option<&str>) -> Result<Option<Price>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => Ok(Some(Price::parse(v)?)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use digital_mart_core::PriceError;
    use serde_json::json;

    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: "Phone X".to_string(),
            price: PriceInput::Text("499.99".to_string()),
            category: "Electronics".to_string(),
            image: "https://img.example/phone.png".to_string(),
            description: "A phone".to_string(),
            stock: None,
            rating: None,
        }
    }

    fn product(name: &str, cents: u32, category: Category) -> Product {
        Product {
            id: ProductId::new(name),
            name: name.to_string(),
            price: Price::from_cents(cents),
            category,
            image: String::new(),
            description: String::new(),
            stock: 5,
            rating: 4.0,
            created_at: None,
        }
    }

    #[test]
    fn test_validate_coerces_price() {
        let new = form().validate().unwrap();
        assert_eq!(new.price, Price::from_cents(49_999));
        assert_eq!(new.category, Category::Electronics);
    }

    #[test]
    fn test_validate_accepts_numeric_price() {
        let mut f = form();
        f.price = serde_json::from_value(json!(12.5)).unwrap();
        assert_eq!(f.validate().unwrap().price, Price::from_cents(1250));
    }

    #[test]
    fn test_validate_rejects_non_numeric_price() {
        let mut f = form();
        f.price = PriceInput::Text("cheap".to_string());
        assert_eq!(
            f.validate(),
            Err(ValidationError::InvalidPrice(PriceError::NotNumeric(
                "cheap".to_string()
            )))
        );
    }

    #[test]
    fn test_validate_reports_missing_field() {
        let mut f = form();
        f.image = "   ".to_string();
        assert_eq!(f.validate(), Err(ValidationError::MissingField("image")));
    }

    #[test]
    fn test_validate_rejects_unknown_category() {
        let mut f = form();
        f.category = "Toys".to_string();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_parse_filters_treats_blank_as_absent() {
        let filters = ProductFilters::parse(Some("all"), Some(""), None, Some("  ")).unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_parse_filters_rejects_bad_bound() {
        let err = ProductFilters::parse(None, Some("ten"), None, None).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPrice(_)));
    }

    #[test]
    fn test_matches_composes_all_filters() {
        let filters = ProductFilters {
            category: Some(Category::Electronics),
            min_price: Some(Price::from_cents(5000)),
            max_price: None,
            search: Some("phone".to_string()),
        };

        assert!(filters.matches(&product("SmartPhone", 60_000, Category::Electronics)));
        assert!(!filters.matches(&product("Phone case", 1_500, Category::Electronics)));
        assert!(!filters.matches(&product("Phone stand", 9_000, Category::Home)));
        assert!(!filters.matches(&product("Tablet", 30_000, Category::Electronics)));
    }

    #[test]
    fn test_stock_flags() {
        let mut p = product("Lamp", 2_000, Category::Home);
        assert!(p.is_low_stock());
        p.stock = 0;
        assert!(p.is_out_of_stock());
        assert!(!p.is_low_stock());
        p.stock = DEFAULT_STOCK;
        assert!(!p.is_low_stock());
    }
}
