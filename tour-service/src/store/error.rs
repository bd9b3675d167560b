//! Store error types
//!
//! Structured errors for document store operations: which operation failed,
//! the category of failure, and the field and value involved when there is
//! one.
//!
//! # Example
//!
//! ```rust
//! use tour_service::store::{StoreError, StoreErrorKind, StoreOperation};
//!
//! let error = StoreError::duplicate_key(StoreOperation::Insert, "name", "The Forest Hiker");
//! assert!(matches!(error.kind, StoreErrorKind::DuplicateKey));
//! assert_eq!(error.value.as_deref(), Some("The Forest Hiker"));
//! ```

use std::fmt;

use crate::tour::CastError;

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Running a filtered, sorted, projected query
    Find,
    /// Adding a new document
    Insert,
    /// Merging a partial update into an existing document
    Update,
    /// Running an aggregation pipeline
    Aggregate,
    /// Loading seed data
    Seed,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find => write!(f, "find"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Aggregate => write!(f, "aggregate"),
            Self::Seed => write!(f, "seed"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// A unique field already holds the value
    DuplicateKey,
    /// A query operand does not fit its field type
    CastFailed,
    /// The query itself is unusable, e.g. a negative skip
    InvalidQuery,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey => write!(f, "duplicate_key"),
            Self::CastFailed => write!(f, "cast_failed"),
            Self::InvalidQuery => write!(f, "invalid_query"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The field involved
    pub field: Option<String>,
    /// The offending value, as text
    pub value: Option<String>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            field: None,
            value: None,
        }
    }

    /// Create a duplicate key error for a unique field
    pub fn duplicate_key(
        operation: StoreOperation,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let value = value.into();
        Self::new(
            operation,
            StoreErrorKind::DuplicateKey,
            format!("E11000 duplicate key error: {{ {}: \"{}\" }}", field, value),
        )
        .with_field(field, value)
    }

    /// Create a cast error from a failed operand cast
    pub fn cast(operation: StoreOperation, err: &CastError) -> Self {
        Self::new(operation, StoreErrorKind::CastFailed, err.to_string())
            .with_field(err.path.clone(), err.value_text())
    }

    /// Create an invalid query error
    pub fn invalid_query(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::InvalidQuery, message)
    }

    /// Attach the field and value involved
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(field), Some(value)) = (&self.field, &self.value) {
            write!(f, " [{}: {}]", field, value)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}
