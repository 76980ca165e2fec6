//! Document and query types shared by every [`DocumentStore`](super::DocumentStore).

use std::cmp::Ordering;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::BackendError;

/// Top-level fields of a document.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id within its collection.
    pub id: String,
    /// Write counter, starting at 1.
    pub version: u64,
    /// Document body.
    pub fields: Fields,
}

impl Document {
    /// Decode the document body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Serialization` if the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Decode the document body with the document id injected as `"id"`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Serialization` if the fields do not match `T`.
    pub fn decode_with_id<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_owned(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Decode a single field, treating an absent or `null` field as `None`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Serialization` if the field does not match `T`.
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, BackendError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }
}

/// Encode a typed value into document fields.
///
/// # Errors
///
/// Returns `BackendError::Serialization` if `value` does not serialize to a
/// JSON object.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, BackendError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(BackendError::Serialization(serde::ser::Error::custom(
            format!("expected a JSON object, got {other}"),
        ))),
    }
}

/// Comparison operator of a [`FieldFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

/// A single predicate on one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    /// Whether a document satisfies this predicate.
    ///
    /// A document whose field is missing or holds a value of another type
    /// never matches, the same way hosted document stores treat it.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };
        match (compare_values(actual, &self.value), self.op) {
            (Some(Ordering::Equal), FilterOp::Eq | FilterOp::Gte | FilterOp::Lte)
            | (Some(Ordering::Greater), FilterOp::Gte)
            | (Some(Ordering::Less), FilterOp::Lte) => true,
            _ => false,
        }
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A query over a single collection.
///
/// ```rust
/// use digital_mart_storefront::backend::{Direction, Query};
///
/// let query = Query::new()
///     .where_eq("category", "Electronics")
///     .where_gte("price", 50.0)
///     .order_by("name", Direction::Ascending);
/// assert_eq!(query.filters().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<FieldFilter>,
    order_by: Option<(String, Direction)>,
}

impl Query {
    /// An unfiltered, unordered query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate.
    #[must_use]
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.with_filter(field, FilterOp::Eq, value.into())
    }

    /// Add a `>=` predicate.
    #[must_use]
    pub fn where_gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.with_filter(field, FilterOp::Gte, value.into())
    }

    /// Add a `<=` predicate.
    #[must_use]
    pub fn where_lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.with_filter(field, FilterOp::Lte, value.into())
    }

    /// Order results by one field. Documents lacking the field are excluded.
    #[must_use]
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_owned(), direction));
        self
    }

    /// Predicates, all of which must hold.
    #[must_use]
    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    /// Requested ordering, if any.
    #[must_use]
    pub fn ordering(&self) -> Option<(&str, Direction)> {
        self.order_by.as_ref().map(|(f, d)| (f.as_str(), *d))
    }

    /// Whether a document satisfies every predicate and has the order-by field.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|f| f.matches(fields))
            && self
                .order_by
                .as_ref()
                .is_none_or(|(field, _)| fields.contains_key(field))
    }

    /// Sort documents according to the requested ordering (stable).
    pub fn sort(&self, documents: &mut [Document]) {
        let Some((field, direction)) = &self.order_by else {
            return;
        };
        documents.sort_by(|a, b| {
            let ord = match (a.fields.get(field), b.fields.get(field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
    }

    fn with_filter(mut self, field: &str, op: FilterOp, value: Value) -> Self {
        self.filters.push(FieldFilter {
            field: field.to_owned(),
            op,
            value,
        });
        self
    }
}

/// Compare two JSON values of the same kind; `None` if they are not comparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => (a == b).then_some(Ordering::Equal),
    }
}
