//! In-memory tour store

use serde_json::json;
use tokio::sync::RwLock;

use super::engine;
use super::error::{StoreError, StoreOperation};
use super::{render, StoreResult, TourRepository};
use crate::ids::TourId;
use crate::pipeline::{Pipeline, Stage};
use crate::query::{DocumentQuery, Filter, Operator};
use crate::tour::{fields, Document, Tour};

/// Filter that hides secret tours
fn visible() -> Filter {
    Filter::new().with_op(fields::SECRET_TOUR, Operator::Ne, json!(true))
}

fn is_visible(tour: &Tour) -> bool {
    !tour.secret_tour
}

/// Unique field of `tour` already held by one of `tours`, with its value
fn duplicate_key(tours: &[Tour], tour: &Tour) -> Option<(&'static str, String)> {
    if tours.iter().any(|t| t.id == tour.id) {
        Some((fields::ID, tour.id.to_string()))
    } else if tours.iter().any(|t| t.name == tour.name) {
        Some((fields::NAME, tour.name.clone()))
    } else {
        None
    }
}

/// Tours held in memory, in insertion order
///
/// Readers share the lock; inserts, updates, and deletes take it
/// exclusively.
#[derive(Debug, Default)]
pub struct MemoryTourStore {
    tours: RwLock<Vec<Tour>>,
}

impl MemoryTourStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `tours`
    ///
    /// Fails with a duplicate key error when two tours share an identifier
    /// or a name.
    pub fn with_tours(tours: Vec<Tour>) -> StoreResult<Self> {
        let mut stored: Vec<Tour> = Vec::with_capacity(tours.len());
        for tour in tours {
            if let Some((field, value)) = duplicate_key(&stored, &tour) {
                return Err(StoreError::duplicate_key(StoreOperation::Seed, field, value));
            }
            stored.push(tour);
        }
        Ok(Self {
            tours: RwLock::new(stored),
        })
    }

    /// Documents of every visible tour, in insertion order
    async fn visible_documents(&self) -> Vec<Document> {
        self.tours
            .read()
            .await
            .iter()
            .filter(|tour| is_visible(tour))
            .map(Tour::to_document)
            .collect()
    }
}

impl TourRepository for MemoryTourStore {
    async fn find(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        let filter = engine::cast_filter(&query.filter, StoreOperation::Find)?;

        let mut documents: Vec<Document> = self
            .visible_documents()
            .await
            .into_iter()
            .filter(|document| engine::matches(document, &filter))
            .collect();

        engine::sort(&mut documents, &query.sort);
        let documents = engine::window(documents, query.skip, query.limit, StoreOperation::Find)?;

        tracing::debug!(
            matched = documents.len(),
            sort = ?query.sort,
            skip = ?query.skip,
            limit = ?query.limit,
            "find"
        );

        Ok(documents
            .iter()
            .map(|document| render(document, query.projection.as_ref()))
            .collect())
    }

    async fn find_by_id(&self, id: &TourId) -> StoreResult<Option<Tour>> {
        let tours = self.tours.read().await;
        Ok(tours
            .iter()
            .find(|tour| tour.id == *id && is_visible(tour))
            .cloned())
    }

    async fn insert(&self, tour: Tour) -> StoreResult<Tour> {
        let mut tours = self.tours.write().await;
        if let Some((field, value)) = duplicate_key(&tours, &tour) {
            return Err(StoreError::duplicate_key(StoreOperation::Insert, field, value));
        }

        tracing::debug!(id = %tour.id, name = %tour.name, "insert");
        tours.push(tour.clone());
        Ok(tour)
    }

    async fn update<F, E>(&self, id: &TourId, apply: F) -> Result<Option<Tour>, E>
    where
        F: FnOnce(&Tour) -> Result<Tour, E> + Send,
        E: From<StoreError> + Send,
    {
        let mut tours = self.tours.write().await;
        let Some(index) = tours.iter().position(|t| t.id == *id && is_visible(t)) else {
            return Ok(None);
        };

        let updated = apply(&tours[index])?;
        if tours.iter().any(|t| t.name == updated.name && t.id != updated.id) {
            return Err(StoreError::duplicate_key(
                StoreOperation::Update,
                fields::NAME,
                updated.name,
            )
            .into());
        }

        tracing::debug!(id = %updated.id, "update");
        tours[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: &TourId) -> StoreResult<Option<Tour>> {
        let mut tours = self.tours.write().await;
        let position = tours.iter().position(|t| t.id == *id && is_visible(t));
        let removed = position.map(|index| tours.remove(index));
        if removed.is_some() {
            tracing::debug!(id = %id, "delete");
        }
        Ok(removed)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let pipeline = pipeline.prepend(Stage::Match(visible()));
        let documents = self.tours.read().await.iter().map(Tour::to_document).collect();
        let output = engine::aggregate(documents, &pipeline)?;
        tracing::debug!(stages = pipeline.stages().len(), results = output.len(), "aggregate");
        Ok(output)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.tours.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline;
    use crate::query::{QuerySpec, RawQuery};
    use crate::store::StoreErrorKind;
    use crate::tour::TourDraft;
    use serde_json::Value;

    fn tour(name: &str, difficulty: &str, price: u32, rating: f64, secret: bool) -> Tour {
        let body = json!({
            "name": name,
            "duration": 5,
            "maxGroupSize": 10,
            "difficulty": difficulty,
            "price": price,
            "ratingsAverage": rating,
            "summary": "A summary",
            "imageCover": "cover.jpg",
            "secretTour": secret,
            "startDates": ["2021-04-25T09:00:00Z"]
        });
        let Value::Object(body) = body else { unreachable!() };
        TourDraft::from_body(&body).into_tour(TourId::new()).unwrap()
    }

    fn store() -> MemoryTourStore {
        MemoryTourStore::with_tours(vec![
            tour("The Forest Hiker", "easy", 397, 4.7, false),
            tour("The Sea Explorer", "medium", 497, 4.8, false),
            tour("The Snow Adventurer", "difficult", 997, 4.5, false),
            tour("The Secret Hideaway", "easy", 100, 5.0, true),
        ])
        .unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> DocumentQuery {
        QuerySpec::new(RawQuery::from_pairs(pairs.iter().copied()))
            .filter()
            .sort()
            .limit_fields()
            .paginate()
            .build()
    }

    fn names(documents: &[Document]) -> Vec<&str> {
        documents
            .iter()
            .filter_map(|d| d.get("name").and_then(Value::as_str))
            .collect()
    }

    #[tokio::test]
    async fn test_find_hides_secret_tours() {
        let store = store();
        let documents = store.find(&query(&[])).await.unwrap();
        assert_eq!(documents.len(), 3);
        assert!(!names(&documents).contains(&"The Secret Hideaway"));
        assert_eq!(store.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_find_filter_sort_project() {
        let store = store();
        let documents = store
            .find(&query(&[("price[gte]", "400"), ("sort", "-price"), ("fields", "name,price")]))
            .await
            .unwrap();

        assert_eq!(names(&documents), vec!["The Snow Adventurer", "The Sea Explorer"]);
        assert!(documents[0].contains_key("_id"));
        assert!(!documents[0].contains_key("difficulty"));
        assert!(!documents[0].contains_key("durationWeeks"));
    }

    #[tokio::test]
    async fn test_find_default_projection() {
        let store = store();
        let documents = store.find(&query(&[])).await.unwrap();
        for document in &documents {
            assert!(!document.contains_key("__v"));
            assert!(!document.contains_key("createdAt"));
            assert!(document.contains_key("durationWeeks"));
        }
    }

    #[tokio::test]
    async fn test_find_pagination_beyond_end_is_empty() {
        let store = store();
        let documents = store
            .find(&query(&[("page", "5"), ("limit", "2")]))
            .await
            .unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_find_negative_skip_is_query_error() {
        let store = store();
        let err = store
            .find(&query(&[("page", "-1"), ("limit", "2")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::InvalidQuery);
    }

    #[tokio::test]
    async fn test_find_cast_error() {
        let store = store();
        let err = store.find(&query(&[("duration", "long")])).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::CastFailed);
        assert_eq!(err.field.as_deref(), Some("duration"));
    }

    #[tokio::test]
    async fn test_insert_duplicate_name() {
        let store = store();
        let err = store
            .insert(tour("The Forest Hiker", "easy", 1, 4.5, false))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::DuplicateKey);
        assert_eq!(err.value.as_deref(), Some("The Forest Hiker"));
    }

    fn keep(tour: &Tour) -> Result<Tour, StoreError> {
        Ok(tour.clone())
    }

    #[tokio::test]
    async fn test_secret_tour_invisible_to_id_operations() {
        let secret = tour("The Hidden Valley Tour", "easy", 10, 4.5, true);
        let store = MemoryTourStore::with_tours(vec![secret.clone()]).unwrap();

        assert_eq!(store.find_by_id(&secret.id).await.unwrap(), None);
        assert_eq!(store.update(&secret.id, keep).await.unwrap(), None);
        assert_eq!(store.delete(&secret.id).await.unwrap(), None);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let original = tour("The Park Camper Tour", "medium", 1497, 4.9, false);
        let store = MemoryTourStore::with_tours(vec![original.clone()]).unwrap();

        let updated = store
            .update(&original.id, |tour| -> Result<Tour, StoreError> {
                let mut changed = tour.clone();
                changed.price = serde_json::Number::from(999);
                Ok(changed)
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.price, serde_json::Number::from(999));
        assert_eq!(store.find_by_id(&original.id).await.unwrap(), Some(updated));

        assert!(store.delete(&original.id).await.unwrap().is_some());
        assert_eq!(store.find_by_id(&original.id).await.unwrap(), None);
        assert_eq!(store.delete(&original.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_error_leaves_tour_unchanged() {
        let original = tour("The Park Camper Tour", "medium", 1497, 4.9, false);
        let store = MemoryTourStore::with_tours(vec![original.clone()]).unwrap();

        let result = store
            .update(&original.id, |_| -> Result<Tour, StoreError> {
                Err(StoreError::invalid_query(StoreOperation::Update, "rejected"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.find_by_id(&original.id).await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_update_rejects_taken_name() {
        let first = tour("The Forest Hiker", "easy", 397, 4.7, false);
        let second = tour("The Sea Explorer", "medium", 497, 4.8, false);
        let store = MemoryTourStore::with_tours(vec![first.clone(), second.clone()]).unwrap();

        let err = store
            .update(&second.id, |tour| -> Result<Tour, StoreError> {
                let mut renamed = tour.clone();
                renamed.name = first.name.clone();
                Ok(renamed)
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::DuplicateKey);
        assert_eq!(err.operation, StoreOperation::Update);
        assert_eq!(store.find_by_id(&second.id).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_concurrent_updates_keep_both_fields() {
        let original = tour("The Park Camper Tour", "medium", 1497, 4.9, false);
        let id = original.id.clone();
        let store = std::sync::Arc::new(MemoryTourStore::with_tours(vec![original]).unwrap());

        let patch = |field: &'static str, value: Value| {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let mut body = Document::new();
                body.insert(field.to_string(), value);
                store
                    .update(&id, |tour| {
                        tour.patched(&body)
                            .map_err(|v| StoreError::invalid_query(StoreOperation::Update, v.to_string()))
                    })
                    .await
            })
        };
        let price = patch("price", json!(999));
        let duration = patch("duration", json!(12));
        price.await.unwrap().unwrap();
        duration.await.unwrap().unwrap();

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.price, serde_json::Number::from(999));
        assert_eq!(stored.duration, serde_json::Number::from(12));
    }

    #[tokio::test]
    async fn test_aggregate_excludes_secret_tours() {
        let store = store();
        let stats = store.aggregate(&pipeline::tour_stats()).await.unwrap();

        let easy = stats.iter().find(|group| group["_id"] == json!("EASY")).unwrap();
        assert_eq!(easy["numTours"], json!(1));
        assert_eq!(easy["minPrice"], json!(397));

        let plan = store.aggregate(&pipeline::monthly_plan(2021).unwrap()).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0]["numTourStarts"], json!(3));
    }

    #[test]
    fn test_with_tours_rejects_duplicate_ids() {
        let first = tour("The Forest Hiker", "easy", 397, 4.7, false);
        let mut second = tour("The Sea Explorer", "medium", 497, 4.8, false);
        second.id = first.id.clone();

        let err = MemoryTourStore::with_tours(vec![first.clone(), second]).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::DuplicateKey);
        assert_eq!(err.field.as_deref(), Some("_id"));
        assert_eq!(err.value.as_deref(), Some(first.id.to_string().as_str()));
    }

    #[test]
    fn test_with_tours_rejects_duplicates() {
        let err = MemoryTourStore::with_tours(vec![
            tour("The Forest Hiker", "easy", 397, 4.7, false),
            tour("The Forest Hiker", "easy", 397, 4.7, false),
        ])
        .unwrap_err();
        assert_eq!(err.operation, StoreOperation::Seed);
    }
}
