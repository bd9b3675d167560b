//! Tour record and field schema

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

use crate::ids::TourId;

/// A stored document: field name to JSON value
pub type Document = Map<String, Value>;

/// Field names of the stored document
pub mod fields {
    pub const ID: &str = "_id";
    pub const NAME: &str = "name";
    pub const SLUG: &str = "slug";
    pub const DURATION: &str = "duration";
    pub const MAX_GROUP_SIZE: &str = "maxGroupSize";
    pub const DIFFICULTY: &str = "difficulty";
    pub const RATINGS_AVERAGE: &str = "ratingsAverage";
    pub const RATINGS_QUANTITY: &str = "ratingsQuantity";
    pub const PRICE: &str = "price";
    pub const PRICE_DISCOUNT: &str = "priceDiscount";
    pub const SUMMARY: &str = "summary";
    pub const DESCRIPTION: &str = "description";
    pub const IMAGE_COVER: &str = "imageCover";
    pub const IMAGES: &str = "images";
    pub const CREATED_AT: &str = "createdAt";
    pub const START_DATES: &str = "startDates";
    pub const SECRET_TOUR: &str = "secretTour";
    pub const VERSION: &str = "__v";
    pub const DURATION_WEEKS: &str = "durationWeeks";
}

/// Type of a schema field, used for casting input and query operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Id,
    String,
    Number,
    Date,
    Boolean,
    StringArray,
    DateArray,
}

impl FieldKind {
    /// Kind of a single element; arrays match element-wise
    pub const fn element(self) -> Self {
        match self {
            Self::StringArray => Self::String,
            Self::DateArray => Self::Date,
            other => other,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "ObjectId"),
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "Number"),
            Self::Date => write!(f, "date"),
            Self::Boolean => write!(f, "Boolean"),
            Self::StringArray => write!(f, "[string]"),
            Self::DateArray => write!(f, "[date]"),
        }
    }
}

/// Stored fields in schema order
pub const SCHEMA: &[(&str, FieldKind)] = &[
    (fields::ID, FieldKind::Id),
    (fields::NAME, FieldKind::String),
    (fields::SLUG, FieldKind::String),
    (fields::DURATION, FieldKind::Number),
    (fields::MAX_GROUP_SIZE, FieldKind::Number),
    (fields::DIFFICULTY, FieldKind::String),
    (fields::RATINGS_AVERAGE, FieldKind::Number),
    (fields::RATINGS_QUANTITY, FieldKind::Number),
    (fields::PRICE, FieldKind::Number),
    (fields::PRICE_DISCOUNT, FieldKind::Number),
    (fields::SUMMARY, FieldKind::String),
    (fields::DESCRIPTION, FieldKind::String),
    (fields::IMAGE_COVER, FieldKind::String),
    (fields::IMAGES, FieldKind::StringArray),
    (fields::CREATED_AT, FieldKind::Date),
    (fields::START_DATES, FieldKind::DateArray),
    (fields::SECRET_TOUR, FieldKind::Boolean),
    (fields::VERSION, FieldKind::Number),
];

/// Fields left out of reads unless a projection names them
pub const HIDDEN_FIELDS: &[&str] = &[fields::CREATED_AT];

/// Schema kind of `field`, `None` for fields the schema does not know
pub fn field_kind(field: &str) -> Option<FieldKind> {
    SCHEMA
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
}

/// Tour difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Difficult];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|d| d.as_str() == s).ok_or(())
    }
}

/// A tour as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    #[serde(rename = "_id")]
    pub id: TourId,
    pub name: String,
    pub slug: String,
    pub duration: Number,
    pub max_group_size: Number,
    pub difficulty: Difficulty,
    pub ratings_average: Number,
    pub ratings_quantity: Number,
    pub price: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<Number>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(with = "date_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "date_list_format")]
    pub start_dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub secret_tour: bool,
    #[serde(rename = "__v", default)]
    pub version: u32,
}

impl Tour {
    /// Stored document form
    pub fn to_document(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(document)) => document,
            _ => Document::new(),
        }
    }

    /// Number of whole and partial weeks, `duration / 7`
    pub fn duration_weeks(&self) -> Option<f64> {
        self.duration.as_f64().map(|days| days / 7.0)
    }
}

/// Add derived fields to a rendered document
///
/// `durationWeeks` appears whenever `duration` does.
pub fn apply_virtuals(document: &mut Document) {
    let weeks = document
        .get(fields::DURATION)
        .and_then(Value::as_f64)
        .and_then(|days| Number::from_f64(days / 7.0));
    if let Some(weeks) = weeks {
        document.insert(fields::DURATION_WEEKS.to_string(), Value::Number(weeks));
    }
}

/// Lower-case, hyphen-separated form of a name
///
/// ```rust
/// use tour_service::tour::slugify;
///
/// assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
/// assert_eq!(slugify("  Sea & Sun: Explorer! "), "sea-sun-explorer");
/// ```
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Canonical text form of a stored date
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) mod date_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

pub(crate) mod date_list_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dates: &[DateTime<Utc>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(dates.iter().map(super::format_date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<DateTime<Utc>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|date| date.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
