//! Seed data loading
//!
//! A seed file is a JSON array of tour objects. Each entry is cast and
//! validated exactly like a create request; an `_id` in the entry is kept
//! when it is a valid tour identifier.

use serde_json::Value;
use std::path::Path;

use super::MemoryTourStore;
use crate::error::{Error, Result};
use crate::ids::TourId;
use crate::tour::{fields, TourDraft, Tour};

/// Parse seed file contents into tours
pub fn parse_seed(contents: &str) -> Result<Vec<Tour>> {
    let entries: Vec<Value> = serde_json::from_str(contents)?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let Value::Object(body) = entry else {
                return Err(Error::Seed(format!("entry {}: expected a JSON object", index)));
            };
            let id = body
                .get(fields::ID)
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse::<TourId>().ok())
                .unwrap_or_default();

            TourDraft::from_body(&body)
                .into_tour(id)
                .map_err(|violations| Error::Seed(format!("entry {}: {}", index, violations)))
        })
        .collect()
}

impl MemoryTourStore {
    /// Create a store holding the tours of a seed file
    pub async fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let tours = parse_seed(&contents)?;
        let count = tours.len();
        let store = Self::with_tours(tours)?;

        tracing::info!(path = %path.display(), tours = count, "Loaded seed data");
        Ok(store)
    }
}
