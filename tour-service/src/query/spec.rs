//! Immutable query builder
//!
//! [`QuerySpec`] wraps the raw request query. Each stage returns a new value
//! with one more instruction filled in, so stages compose in any order and an
//! intermediate spec can be reused freely:
//!
//! ```rust
//! use tour_service::query::{QuerySpec, RawQuery, SortKey};
//!
//! let raw = RawQuery::from_pairs([("duration[gte]", "5"), ("sort", "price"), ("page", "2"), ("limit", "10")]);
//! let query = QuerySpec::new(raw).filter().sort().limit_fields().paginate().build();
//!
//! assert_eq!(query.sort, vec![SortKey::asc("price")]);
//! assert_eq!(query.skip, Some(10));
//! assert_eq!(query.limit, Some(10));
//! ```

use serde_json::Value;
use std::sync::Arc;

use super::filter::{Filter, Operator};
use super::options::{
    coerce_number, Projection, SortKey, Window, DEFAULT_LIMIT, DEFAULT_PAGE,
};
use super::raw::{RawQuery, RawValue};
use super::DocumentQuery;

/// Query-string keys that control the query rather than filter it
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Query under construction
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    raw: Arc<RawQuery>,
    filter: Option<Filter>,
    sort: Option<Vec<SortKey>>,
    projection: Option<Projection>,
    window: Option<Window>,
}

impl QuerySpec {
    /// Start from a raw query mapping
    pub fn new(raw: RawQuery) -> Self {
        Self {
            raw: Arc::new(raw),
            ..Self::default()
        }
    }

    /// Equality and comparison filters from every non-reserved key
    #[must_use]
    pub fn filter(&self) -> Self {
        let filter = self
            .raw
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(key))
            .fold(Filter::new(), |filter, (key, value)| match value {
                RawValue::Nested(ops) => ops.iter().fold(filter, |filter, (op, operand)| {
                    filter.with_op(key, Operator::from_query_key(op), operand_value(operand))
                }),
                other => filter.with_eq(key, operand_value(other)),
            });

        Self {
            filter: Some(filter),
            ..self.clone()
        }
    }

    /// Sort keys from `sort`, newest first when absent
    #[must_use]
    pub fn sort(&self) -> Self {
        let sort = match self.raw.get("sort") {
            Some(RawValue::Single(list)) => SortKey::parse_list(list),
            Some(RawValue::Many(lists)) => SortKey::parse_list(&lists.join(",")),
            Some(RawValue::Nested(_)) | None => SortKey::default_order(),
        };

        Self {
            sort: Some(sort),
            ..self.clone()
        }
    }

    /// Projection from `fields`, excluding `__v` when absent
    #[must_use]
    pub fn limit_fields(&self) -> Self {
        let projection = match self.raw.get("fields") {
            Some(RawValue::Single(list)) => Projection::parse_list(list),
            Some(RawValue::Many(lists)) => Projection::parse_list(&lists.join(",")),
            Some(RawValue::Nested(_)) | None => Projection::default_exclusion(),
        };

        Self {
            projection: Some(projection),
            ..self.clone()
        }
    }

    /// Page window from `page` and `limit`
    #[must_use]
    pub fn paginate(&self) -> Self {
        let single = |key: &str| self.raw.get(key).and_then(RawValue::as_single);
        let window = Window {
            page: coerce_number(single("page"), DEFAULT_PAGE),
            limit: coerce_number(single("limit"), DEFAULT_LIMIT),
        };

        Self {
            window: Some(window),
            ..self.clone()
        }
    }

    /// Finish the query; stages never applied leave their part unset
    pub fn build(self) -> DocumentQuery {
        DocumentQuery {
            filter: self.filter.unwrap_or_default(),
            sort: self.sort.unwrap_or_default(),
            projection: self.projection,
            skip: self.window.map(|w| w.skip()),
            limit: self.window.map(|w| w.limit),
        }
    }
}

fn operand_value(value: &RawValue) -> Value {
    match value {
        RawValue::Single(s) => Value::String(s.clone()),
        RawValue::Many(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        RawValue::Nested(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), operand_value(v)))
                .collect(),
        ),
    }
}
