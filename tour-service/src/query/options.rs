//! Sort keys, field projections, and pagination windows

use serde::Serialize;
use std::fmt;

/// Default page number
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size
pub const DEFAULT_LIMIT: i64 = 100;

/// Field sorted on when the request names none
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Field excluded when the request names no projection
pub const VERSION_FIELD: &str = "__v";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One `(field, direction)` pair of a multi-key sort
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parse a comma-separated sort list such as `-ratingsAverage,price`
    ///
    /// Empty segments are ignored. An empty list yields the default sort,
    /// newest first.
    ///
    /// ```rust
    /// use tour_service::query::SortKey;
    ///
    /// let keys = SortKey::parse_list("-ratingsAverage,price");
    /// assert_eq!(keys, vec![SortKey::desc("ratingsAverage"), SortKey::asc("price")]);
    /// assert_eq!(SortKey::parse_list(""), vec![SortKey::desc("createdAt")]);
    /// ```
    pub fn parse_list(list: &str) -> Vec<Self> {
        let keys: Vec<Self> = list
            .split(',')
            .map(str::trim)
            .filter_map(|segment| match segment.strip_prefix('-') {
                Some(field) if !field.is_empty() => Some(Self::desc(field)),
                Some(_) => None,
                None if segment.is_empty() => None,
                None => Some(Self::asc(segment)),
            })
            .collect();

        if keys.is_empty() {
            Self::default_order()
        } else {
            keys
        }
    }

    /// `createdAt` descending
    pub fn default_order() -> Vec<Self> {
        vec![Self::desc(DEFAULT_SORT_FIELD)]
    }
}

/// Field projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    /// Keep only these fields (plus `_id` unless `exclude_id`)
    Include {
        fields: Vec<String>,
        exclude_id: bool,
    },
    /// Drop these fields
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse a comma-separated field list
    ///
    /// The first field decides the mode: a leading `-` selects exclusion.
    /// Entries of the other mode are dropped, except `-_id` which may
    /// accompany an inclusion list.
    ///
    /// ```rust
    /// use tour_service::query::Projection;
    ///
    /// assert_eq!(
    ///     Projection::parse_list("-createdAt,-__v"),
    ///     Projection::Exclude(vec!["createdAt".into(), "__v".into()])
    /// );
    /// ```
    pub fn parse_list(list: &str) -> Self {
        let segments: Vec<&str> = list
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty() && *segment != "-")
            .collect();

        match segments.first() {
            None => Self::default_exclusion(),
            Some(first) if first.starts_with('-') => Self::Exclude(
                segments
                    .iter()
                    .filter_map(|segment| segment.strip_prefix('-'))
                    .map(str::to_string)
                    .collect(),
            ),
            Some(_) => {
                let mut fields = Vec::new();
                let mut exclude_id = false;
                for segment in segments {
                    match segment.strip_prefix('-') {
                        Some("_id") => exclude_id = true,
                        Some(_) => {}
                        None => fields.push(segment.to_string()),
                    }
                }
                Self::Include { fields, exclude_id }
            }
        }
    }

    /// Exclude the internal version field
    pub fn default_exclusion() -> Self {
        Self::Exclude(vec![VERSION_FIELD.to_string()])
    }

    /// Whether `field` was named explicitly in an inclusion list
    pub fn includes(&self, field: &str) -> bool {
        match self {
            Self::Include { fields, .. } => fields.iter().any(|f| f == field),
            Self::Exclude(_) => false,
        }
    }
}

/// Page window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub page: i64,
    pub limit: i64,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Window {
    /// Documents skipped before the page starts; negative inputs propagate
    pub fn skip(&self) -> i64 {
        (self.page.saturating_sub(1)).saturating_mul(self.limit)
    }
}

/// Coerce a query value the way `value * 1 || default` does
///
/// Surrounding whitespace is ignored and the empty string counts as zero.
/// Zero, non-numeric, and non-finite values fall back to `default`; anything
/// else is truncated toward zero.
pub fn coerce_number(value: Option<&str>, default: i64) -> i64 {
    let Some(value) = value else {
        return default;
    };
    let trimmed = value.trim();
    if trimmed.is_empty() || !looks_numeric(trimmed) {
        return default;
    }
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() && number.trunc() != 0.0 => number.trunc() as i64,
        Ok(number) if number.is_finite() && number != 0.0 => {
            // |x| < 1 truncates to zero but is still truthy
            0
        }
        _ => default,
    }
}

// Rejects the `inf`/`nan` spellings that `f64::from_str` accepts
fn looks_numeric(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}
