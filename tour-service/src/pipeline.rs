//! Aggregation pipelines as data
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s that the store executes
//! against its documents. The two fixed reports the service exposes are
//! built by [`tour_stats`] and [`monthly_plan`].

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::query::{Filter, Operator, Projection, SortDirection, SortKey};
use crate::tour::{fields, format_date};

/// Minimum rating counted by the statistics report
pub const STATS_MIN_RATING: f64 = 4.5;

/// Number of months reported by the monthly plan
pub const MONTHS_PER_YEAR: usize = 12;

const RFC3339_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Value expression evaluated per document
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Value of a document field, `null` when missing
    Field(String),
    /// Constant
    Literal(Value),
    /// Upper-cased string; `null` becomes the empty string
    ToUpper(Box<Expr>),
    /// Month (1-12) of a date
    Month(Box<Expr>),
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    fn to_document(&self) -> Value {
        match self {
            Self::Field(name) => Value::String(format!("${}", name)),
            Self::Literal(value) => value.clone(),
            Self::ToUpper(inner) => json!({ "$toUpper": inner.to_document() }),
            Self::Month(inner) => json!({ "$month": inner.to_document() }),
        }
    }
}

/// Group accumulator
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Sum of numeric values; a literal `1` counts documents
    Sum(Expr),
    /// Mean of numeric values, `null` when there are none
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    /// Every value, in document order
    Push(Expr),
}

impl Accumulator {
    /// Number of documents in the group
    pub fn count() -> Self {
        Self::Sum(Expr::Literal(json!(1)))
    }

    fn to_document(&self) -> Value {
        match self {
            Self::Sum(expr) => json!({ "$sum": expr.to_document() }),
            Self::Avg(expr) => json!({ "$avg": expr.to_document() }),
            Self::Min(expr) => json!({ "$min": expr.to_document() }),
            Self::Max(expr) => json!({ "$max": expr.to_document() }),
            Self::Push(expr) => json!({ "$push": expr.to_document() }),
        }
    }
}

/// One pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep documents matching the filter
    Match(Filter),
    /// One document per element of an array field
    Unwind(String),
    /// Group by `key`; output documents carry the key as `_id`
    Group {
        key: Expr,
        accumulators: Vec<(String, Accumulator)>,
    },
    /// Set fields from expressions
    AddFields(Vec<(String, Expr)>),
    /// Reshape documents
    Project(Projection),
    /// Stable multi-key sort
    Sort(Vec<SortKey>),
    /// Keep the first n documents
    Limit(usize),
}

impl Stage {
    /// Render in the document-store stage shape
    pub fn to_document(&self) -> Value {
        match self {
            Self::Match(filter) => json!({ "$match": filter.to_document() }),
            Self::Unwind(field) => json!({ "$unwind": format!("${}", field) }),
            Self::Group { key, accumulators } => {
                let mut group = Map::new();
                group.insert(fields::ID.to_string(), key.to_document());
                for (name, accumulator) in accumulators {
                    group.insert(name.clone(), accumulator.to_document());
                }
                json!({ "$group": group })
            }
            Self::AddFields(assignments) => {
                let set: Map<String, Value> = assignments
                    .iter()
                    .map(|(name, expr)| (name.clone(), expr.to_document()))
                    .collect();
                json!({ "$addFields": set })
            }
            Self::Project(projection) => {
                let shape: Map<String, Value> = match projection {
                    Projection::Include {
                        fields: names,
                        exclude_id,
                    } => {
                        let mut shape: Map<String, Value> =
                            names.iter().map(|f| (f.clone(), json!(1))).collect();
                        if *exclude_id {
                            shape.insert(fields::ID.to_string(), json!(0));
                        }
                        shape
                    }
                    Projection::Exclude(names) => {
                        names.iter().map(|f| (f.clone(), json!(0))).collect()
                    }
                };
                json!({ "$project": shape })
            }
            Self::Sort(keys) => {
                let order: Map<String, Value> = keys
                    .iter()
                    .map(|key| {
                        let direction = match key.direction {
                            SortDirection::Ascending => 1,
                            SortDirection::Descending => -1,
                        };
                        (key.field.clone(), json!(direction))
                    })
                    .collect();
                json!({ "$sort": order })
            }
            Self::Limit(n) => json!({ "$limit": n }),
        }
    }
}

/// Ordered stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Copy with `stage` run before every existing stage
    #[must_use]
    pub fn prepend(&self, stage: Stage) -> Self {
        let mut stages = Vec::with_capacity(self.stages.len() + 1);
        stages.push(stage);
        stages.extend(self.stages.iter().cloned());
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn to_document(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_document).collect())
    }
}

/// Statistics per difficulty over well-rated tours, cheapest average first
///
/// Groups carry `numTours`, `numRatings`, `avgRating`, `avgPrice`,
/// `minPrice`, and `maxPrice`.
pub fn tour_stats() -> Pipeline {
    Pipeline::new(vec![
        Stage::Match(Filter::new().with_op(
            fields::RATINGS_AVERAGE,
            Operator::Gte,
            json!(STATS_MIN_RATING),
        )),
        Stage::Group {
            key: Expr::ToUpper(Box::new(Expr::field(fields::DIFFICULTY))),
            accumulators: vec![
                ("numTours".to_string(), Accumulator::count()),
                (
                    "numRatings".to_string(),
                    Accumulator::Sum(Expr::field(fields::RATINGS_QUANTITY)),
                ),
                (
                    "avgRating".to_string(),
                    Accumulator::Avg(Expr::field(fields::RATINGS_AVERAGE)),
                ),
                ("avgPrice".to_string(), Accumulator::Avg(Expr::field(fields::PRICE))),
                ("minPrice".to_string(), Accumulator::Min(Expr::field(fields::PRICE))),
                ("maxPrice".to_string(), Accumulator::Max(Expr::field(fields::PRICE))),
            ],
        },
        Stage::Sort(vec![SortKey::asc("avgPrice")]),
    ])
}

/// Tour starts per month of `year`, busiest month first
///
/// Start dates count from `year-01-01T00:00Z` through `year-12-31T00:00Z`
/// inclusive. Returns `None` for years outside `0..=9999`, which have no
/// RFC 3339 timestamp.
pub fn monthly_plan(year: i32) -> Option<Pipeline> {
    if !RFC3339_YEARS.contains(&year) {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?.and_utc();
    let last = NaiveDate::from_ymd_opt(year, 12, 31)?.and_hms_opt(0, 0, 0)?.and_utc();

    Some(Pipeline::new(vec![
        Stage::Unwind(fields::START_DATES.to_string()),
        Stage::Match(
            Filter::new()
                .with_op(fields::START_DATES, Operator::Gte, json!(format_date(&first)))
                .with_op(fields::START_DATES, Operator::Lte, json!(format_date(&last))),
        ),
        Stage::Group {
            key: Expr::Month(Box::new(Expr::field(fields::START_DATES))),
            accumulators: vec![
                ("numTourStarts".to_string(), Accumulator::count()),
                ("tours".to_string(), Accumulator::Push(Expr::field(fields::NAME))),
            ],
        },
        Stage::AddFields(vec![("month".to_string(), Expr::field(fields::ID))]),
        Stage::Project(Projection::Exclude(vec![fields::ID.to_string()])),
        Stage::Sort(vec![SortKey::desc("numTourStarts")]),
        Stage::Limit(MONTHS_PER_YEAR),
    ]))
}
