//! Raw query-string mapping
//!
//! Mirrors how a query string decodes into a flat mapping: plain keys carry a
//! string, repeated keys an ordered sequence, and bracketed keys such as
//! `price[gte]=500` a nested mapping (`price: {gte: "500"}`).

use std::fmt;

/// A single value of the raw query mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// `key=value`
    Single(String),
    /// `key=a&key=b`, in arrival order
    Many(Vec<String>),
    /// `key[op]=value`, in arrival order of the inner keys
    Nested(Vec<(String, RawValue)>),
}

impl RawValue {
    /// The string value, only for a key that appeared once without brackets
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            _ => None,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                let first = std::mem::take(first);
                *self = Self::Many(vec![first, value]);
            }
            Self::Many(values) => values.push(value),
            // A bare key never overrides its bracketed form
            Self::Nested(_) => {}
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => write!(f, "{}", value),
            Self::Many(values) => write!(f, "{}", values.join(",")),
            Self::Nested(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Raw query mapping, keys kept in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery {
    entries: Vec<(String, RawValue)>,
}

impl RawQuery {
    /// Create an empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the mapping from decoded `key=value` pairs
    ///
    /// ```rust
    /// use tour_service::query::{RawQuery, RawValue};
    ///
    /// let raw = RawQuery::from_pairs(vec![
    ///     ("price[gte]".to_string(), "500".to_string()),
    ///     ("difficulty".to_string(), "easy".to_string()),
    /// ]);
    /// assert_eq!(
    ///     raw.get("price"),
    ///     Some(&RawValue::Nested(vec![("gte".to_string(), RawValue::Single("500".to_string()))]))
    /// );
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut raw = Self::new();
        for (key, value) in pairs {
            raw.insert_pair(key.into(), value.into());
        }
        raw
    }

    fn insert_pair(&mut self, key: String, value: String) {
        match split_bracketed(&key) {
            Some((name, inner)) => self.insert_nested(name, inner, value),
            None => self.insert_plain(key, value),
        }
    }

    fn insert_plain(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((key, RawValue::Single(value))),
        }
    }

    fn insert_nested(&mut self, name: &str, inner: &str, value: String) {
        let position = self.entries.iter().position(|(k, _)| k == name);
        let index = match position {
            Some(index) => index,
            None => {
                self.entries
                    .push((name.to_string(), RawValue::Nested(Vec::new())));
                self.entries.len() - 1
            }
        };

        let slot = &mut self.entries[index].1;
        if !matches!(slot, RawValue::Nested(_)) {
            *slot = RawValue::Nested(Vec::new());
        }
        if let RawValue::Nested(nested) = slot {
            match nested.iter_mut().find(|(k, _)| k == inner) {
                Some((_, existing)) => existing.push(value),
                None => nested.push((inner.to_string(), RawValue::Single(value))),
            }
        }
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Return a copy with `key` set to a single value, replacing any prior value
    #[must_use]
    pub fn with(&self, key: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        let value = RawValue::Single(value.into());
        match next.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => next.entries.push((key.to_string(), value)),
        }
        next
    }

    /// Iterate over keys and values in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawQuery {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

/// `name[inner]` → `(name, inner)`; anything else (including deeper nesting) is a plain key
fn split_bracketed(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let rest = key[open + 1..].strip_suffix(']')?;
    let name = &key[..open];
    if name.is_empty() || rest.is_empty() || rest.contains('[') || rest.contains(']') {
        return None;
    }
    Some((name, rest))
}
