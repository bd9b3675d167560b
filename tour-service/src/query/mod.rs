//! Query-string translation
//!
//! Turns the decoded query string of a list request into the instructions
//! the document store executes: a filter, a multi-key sort, a field
//! projection, and a skip/limit window.
//!
//! - [`RawQuery`]: the query string as a mapping, with bracket syntax nested
//! - [`QuerySpec`]: immutable builder with `filter`, `sort`, `limit_fields`,
//!   and `paginate` stages
//! - [`DocumentQuery`]: the finished query
//!
//! The translator never fails. Operands stay strings here; the store casts
//! them against the field types it knows.

mod filter;
mod options;
mod raw;
mod spec;

pub use filter::{Condition, Filter, Operator};
pub use options::{
    coerce_number, Projection, SortDirection, SortKey, Window, DEFAULT_LIMIT, DEFAULT_PAGE,
    DEFAULT_SORT_FIELD, VERSION_FIELD,
};
pub use raw::{RawQuery, RawValue};
pub use spec::{QuerySpec, RESERVED_KEYS};

/// Finished query handed to the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    /// Conditions every returned document satisfies
    pub filter: Filter,
    /// Sort keys, most significant first; empty keeps insertion order
    pub sort: Vec<SortKey>,
    /// Projection applied to each document; `None` keeps every visible field
    pub projection: Option<Projection>,
    /// Documents skipped before the first result
    pub skip: Option<i64>,
    /// Maximum number of results; zero means no limit
    pub limit: Option<i64>,
}

impl DocumentQuery {
    /// Query matching `filter` with no other instructions
    pub fn matching(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}
