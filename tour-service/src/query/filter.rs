//! Filter documents
//!
//! A [`Filter`] is an ordered list of per-field conditions, all of which must
//! hold. It renders to the document-store filter shape, where comparison
//! operators carry the `$` sigil:
//!
//! ```rust
//! use serde_json::json;
//! use tour_service::query::{Filter, Operator};
//!
//! let filter = Filter::new()
//!     .with_eq("difficulty", json!("easy"))
//!     .with_op("price", Operator::Gte, json!("500"));
//!
//! assert_eq!(
//!     filter.to_document(),
//!     json!({ "difficulty": "easy", "price": { "$gte": "500" } })
//! );
//! ```

use serde_json::{Map, Value};
use std::fmt;

/// Comparison operator of a filter condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `$gte`
    Gte,
    /// `$gt`
    Gt,
    /// `$lte`
    Lte,
    /// `$lt`
    Lt,
    /// `$ne`
    Ne,
    /// A key that is not a recognized operator, kept exactly as received
    Verbatim(String),
}

impl Operator {
    /// Map a query-string operator key (`gte`, `gt`, `lte`, `lt`) to its engine operator
    ///
    /// Only whole keys match; every other key is passed through verbatim.
    ///
    /// ```rust
    /// use tour_service::query::Operator;
    ///
    /// assert_eq!(Operator::from_query_key("gte"), Operator::Gte);
    /// assert_eq!(Operator::from_query_key("gtx"), Operator::Verbatim("gtx".to_string()));
    /// ```
    pub fn from_query_key(key: &str) -> Self {
        match key {
            "gte" => Self::Gte,
            "gt" => Self::Gt,
            "lte" => Self::Lte,
            "lt" => Self::Lt,
            other => Self::Verbatim(other.to_string()),
        }
    }

    /// Engine-native spelling
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gte => "$gte",
            Self::Gt => "$gt",
            Self::Lte => "$lte",
            Self::Lt => "$lt",
            Self::Ne => "$ne",
            Self::Verbatim(key) => key,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Condition on one field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the operand; an array operand matches any of its elements
    Equals(Value),
    /// Every `(operator, operand)` pair must hold
    Compare(Vec<(Operator, Value)>),
}

impl Condition {
    fn to_value(&self) -> Value {
        match self {
            Self::Equals(value) => value.clone(),
            Self::Compare(ops) => Value::Object(
                ops.iter()
                    .map(|(op, operand)| (op.as_str().to_string(), operand.clone()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

}

/// Conjunction of field conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    /// Empty filter; matches every document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition, replacing any condition on the same field
    #[must_use]
    pub fn with_eq(self, field: impl Into<String>, value: Value) -> Self {
        self.with_condition(field, Condition::Equals(value))
    }

    /// Add a comparison, merging with an existing comparison on the same field
    #[must_use]
    pub fn with_op(mut self, field: impl Into<String>, op: Operator, value: Value) -> Self {
        let field = field.into();
        match self.clauses.iter_mut().find(|(f, _)| *f == field) {
            Some((_, Condition::Compare(ops))) => ops.push((op, value)),
            Some((_, condition)) => *condition = Condition::Compare(vec![(op, value)]),
            None => self
                .clauses
                .push((field, Condition::Compare(vec![(op, value)]))),
        }
        self
    }

    /// Add a condition, replacing any condition on the same field
    #[must_use]
    pub fn with_condition(mut self, field: impl Into<String>, condition: Condition) -> Self {
        let field = field.into();
        match self.clauses.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = condition,
            None => self.clauses.push((field, condition)),
        }
        self
    }

    /// Condition on `field`, if any
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.clauses
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, condition)| condition)
    }

    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render as a store filter document
    pub fn to_document(&self) -> Value {
        Value::Object(
            self.clauses
                .iter()
                .map(|(field, condition)| (field.clone(), condition.to_value()))
                .collect(),
        )
    }
}
