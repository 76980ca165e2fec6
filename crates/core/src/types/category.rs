//! Product categories.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known category.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category '{0}'")]
pub struct CategoryError(pub String);

/// The fixed set of catalog categories.
///
/// Stored in documents by display name (`"Electronics"`), which is also the
/// value the catalog filter sends as an equality predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Fashion,
    Home,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Self; 3] = [Self::Electronics, Self::Fashion, Self::Home];

    /// Display name, identical to the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Fashion => "Fashion",
            Self::Home => "Home",
        }
    }

    /// Parse a category filter value.
    ///
    /// `"all"` and the empty string mean "no category filter" and yield `None`.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError` for any other unknown value.
    pub fn parse_filter(value: &str) -> Result<Option<Self>, CategoryError> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            return Ok(None);
        }
        value.parse().map(Some)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("electronics".parse::<Category>().unwrap(), Category::Electronics);
        assert_eq!("HOME".parse::<Category>().unwrap(), Category::Home);
        assert!("Toys".parse::<Category>().is_err());
    }

    #[test]
    fn test_parse_filter_all_means_none() {
        assert_eq!(Category::parse_filter("all").unwrap(), None);
        assert_eq!(Category::parse_filter("").unwrap(), None);
        assert_eq!(
            Category::parse_filter("Fashion").unwrap(),
            Some(Category::Fashion)
        );
        assert_eq!(
            Category::parse_filter("Garden"),
            Err(CategoryError("Garden".to_string()))
        );
    }

    #[test]
    fn test_serializes_as_display_name() {
        let json = serde_json::to_string(&Category::Electronics).unwrap();
        assert_eq!(json, "\"Electronics\"");
    }
}
