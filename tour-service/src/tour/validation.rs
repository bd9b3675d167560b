//! Tour input casting and validation
//!
//! Validation is a separate step from storage: a [`TourDraft`] is cast from a
//! request body, then checked against the schema rules, and only a valid
//! draft becomes a [`Tour`]. Violations are reported per field in schema
//! order, at most one per field.

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Number, Value};
use std::fmt;

use super::cast::{cast_date, cast_number, cast_value, CastError};
use super::model::{fields, field_kind, slugify, Difficulty, Document, Tour, SCHEMA};
use crate::ids::TourId;

const NAME_MIN_LEN: usize = 10;
const NAME_MAX_LEN: usize = 40;
const RATING_MIN: f64 = 1.0;
const RATING_MAX: f64 = 5.0;
const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

/// Fields a request body can never set
const SYSTEM_FIELDS: &[&str] = &[fields::ID, fields::SLUG, fields::VERSION];

/// One failed rule on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Ordered list of violations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Messages in order
    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.message.as_str()).collect()
    }

    /// Violation for `field`, if any
    pub fn get(&self, field: &str) -> Option<&Violation> {
        self.0.iter().find(|v| v.field == field)
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(". "))
    }
}

impl std::error::Error for Violations {}

impl From<Vec<Violation>> for Violations {
    fn from(violations: Vec<Violation>) -> Self {
        Self(violations)
    }
}

/// Cast but not yet validated tour input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TourDraft {
    pub name: Option<String>,
    pub duration: Option<Number>,
    pub max_group_size: Option<Number>,
    pub difficulty: Option<String>,
    pub ratings_average: Option<Number>,
    pub ratings_quantity: Option<Number>,
    pub price: Option<Number>,
    pub price_discount: Option<Number>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub created_at: Option<DateTime<Utc>>,
    pub start_dates: Option<Vec<DateTime<Utc>>>,
    pub secret_tour: Option<bool>,
    cast_errors: Vec<CastError>,
}

impl TourDraft {
    /// Cast a JSON body into a draft
    ///
    /// Unknown fields and system fields (`_id`, `slug`, `__v`) are dropped.
    /// `null` leaves a field unset. Values that cannot be cast are kept as
    /// violations and reported by [`validate`](Self::validate).
    pub fn from_body(body: &Document) -> Self {
        let mut draft = Self::default();

        for (field, kind) in SCHEMA {
            if SYSTEM_FIELDS.contains(field) {
                continue;
            }
            let Some(raw) = body.get(*field) else {
                continue;
            };
            match cast_value(*kind, raw, field) {
                Ok(value) => draft.set(field, &value),
                Err(err) => draft.cast_errors.push(err),
            }
        }

        draft
    }

    fn set(&mut self, field: &str, value: &Value) {
        let text = || value.as_str().map(|s| s.trim().to_string());
        let number = || cast_number(value);
        let strings = || {
            value.as_array().map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
        };

        match field {
            fields::NAME => self.name = text(),
            fields::DURATION => self.duration = number(),
            fields::MAX_GROUP_SIZE => self.max_group_size = number(),
            fields::DIFFICULTY => self.difficulty = value.as_str().map(str::to_string),
            fields::RATINGS_AVERAGE => self.ratings_average = number(),
            fields::RATINGS_QUANTITY => self.ratings_quantity = number(),
            fields::PRICE => self.price = number(),
            fields::PRICE_DISCOUNT => self.price_discount = number(),
            fields::SUMMARY => self.summary = text(),
            fields::DESCRIPTION => self.description = text(),
            fields::IMAGE_COVER => self.image_cover = value.as_str().map(str::to_string),
            fields::IMAGES => self.images = strings(),
            fields::CREATED_AT => self.created_at = cast_date(value),
            fields::START_DATES => {
                self.start_dates = value
                    .as_array()
                    .map(|items| items.iter().filter_map(cast_date).collect())
            }
            fields::SECRET_TOUR => self.secret_tour = value.as_bool(),
            _ => {}
        }
    }

    /// Check every schema rule
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();

        for (field, _) in SCHEMA {
            if let Some(err) = self.cast_errors.iter().find(|e| e.path == *field) {
                violations.push(Violation::new(*field, err.to_string()));
                continue;
            }
            if let Some(message) = self.check(field) {
                violations.push(Violation::new(*field, message));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check(&self, field: &str) -> Option<String> {
        let required = |present: bool, message: &str| (!present).then(|| message.to_string());
        let filled = |value: &Option<String>| value.as_deref().is_some_and(|s| !s.is_empty());

        match field {
            fields::NAME => {
                let length = self.name.as_deref().map(|s| s.chars().count());
                match length {
                    None | Some(0) => Some("A tour must have a name".to_string()),
                    Some(n) if n > NAME_MAX_LEN => Some(format!(
                        "A tour name must have less or equal then {} characters",
                        NAME_MAX_LEN
                    )),
                    Some(n) if n < NAME_MIN_LEN => Some(format!(
                        "A tour name must have more or equal then {} characters",
                        NAME_MIN_LEN
                    )),
                    Some(_) => None,
                }
            }
            fields::DURATION => required(self.duration.is_some(), "A tour must have a duration"),
            fields::MAX_GROUP_SIZE => {
                required(self.max_group_size.is_some(), "A tour must have a group size")
            }
            fields::DIFFICULTY => match self.difficulty.as_deref() {
                None | Some("") => Some("A tour must have a difficulty".to_string()),
                Some(value) if value.parse::<Difficulty>().is_err() => {
                    Some("Difficulty is either: easy, medium, difficult".to_string())
                }
                Some(_) => None,
            },
            fields::RATINGS_AVERAGE => match self.ratings_average.as_ref().and_then(Number::as_f64)
            {
                Some(rating) if rating < RATING_MIN => Some("Rating must be above 1.0".to_string()),
                Some(rating) if rating > RATING_MAX => Some("Rating must be below 5.0".to_string()),
                _ => None,
            },
            fields::PRICE => required(self.price.is_some(), "A tour must have a price"),
            fields::PRICE_DISCOUNT => {
                let discount = self.price_discount.as_ref()?;
                let price = self.price.as_ref().and_then(Number::as_f64)?;
                match discount.as_f64() {
                    Some(value) if value >= price => Some(format!(
                        "Discount price ({}) should be below regular price",
                        discount
                    )),
                    _ => None,
                }
            }
            fields::SUMMARY => required(filled(&self.summary), "A tour must have a description"),
            fields::IMAGE_COVER => {
                required(filled(&self.image_cover), "A tour must have a cover image")
            }
            _ => None,
        }
    }

    /// Validate and build the tour stored under `id`
    pub fn into_tour(self, id: TourId) -> Result<Tour, Violations> {
        self.validate()?;

        let missing = || Violations::from(vec![Violation::new(fields::ID, "Incomplete tour")]);
        let name = self.name.ok_or_else(missing)?;
        let difficulty = self
            .difficulty
            .as_deref()
            .and_then(|d| d.parse::<Difficulty>().ok())
            .ok_or_else(missing)?;

        Ok(Tour {
            id,
            slug: slugify(&name),
            name,
            duration: self.duration.ok_or_else(missing)?,
            max_group_size: self.max_group_size.ok_or_else(missing)?,
            difficulty,
            ratings_average: self
                .ratings_average
                .or_else(|| Number::from_f64(DEFAULT_RATINGS_AVERAGE))
                .ok_or_else(missing)?,
            ratings_quantity: self.ratings_quantity.unwrap_or_else(|| Number::from(0)),
            price: self.price.ok_or_else(missing)?,
            price_discount: self.price_discount,
            summary: self.summary.ok_or_else(missing)?,
            description: self.description.filter(|d| !d.is_empty()),
            image_cover: self.image_cover.ok_or_else(missing)?,
            images: self.images.unwrap_or_default(),
            created_at: self
                .created_at
                .unwrap_or_else(|| Utc::now().trunc_subsecs(3)),
            start_dates: self.start_dates.unwrap_or_default(),
            secret_tour: self.secret_tour.unwrap_or(false),
            version: 0,
        })
    }
}

impl Tour {
    /// Apply a partial update and re-validate the result
    ///
    /// The identifier and version are kept; the slug follows the new name.
    pub fn patched(&self, patch: &Document) -> Result<Tour, Violations> {
        let mut merged = self.to_document();
        for (field, value) in patch {
            if field_kind(field).is_some() && !SYSTEM_FIELDS.contains(&field.as_str()) {
                merged.insert(field.clone(), value.clone());
            }
        }

        let mut tour = TourDraft::from_body(&merged).into_tour(self.id.clone())?;
        tour.version = self.version;
        Ok(tour)
    }
}
