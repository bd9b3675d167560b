//! Tour records
//!
//! - [`Tour`]: the stored record and its document form
//! - [`TourDraft`]: request input cast to field types, validated on demand
//! - [`cast_value`]: schema-driven casting shared with the store's query engine

mod cast;
mod model;
mod validation;

pub use cast::{cast_date, cast_number, cast_value, parse_date, CastError};
pub use model::{
    apply_virtuals, field_kind, fields, format_date, slugify, Difficulty, Document, FieldKind,
    Tour, HIDDEN_FIELDS, SCHEMA,
};
pub use validation::{TourDraft, Violation, Violations};
