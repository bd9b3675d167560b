//! Tour document store
//!
//! [`TourRepository`] is the storage seam the handlers depend on. It uses
//! RPITIT (Return Position Impl Trait In Traits) for async methods without
//! `async_trait`.
//!
//! [`MemoryTourStore`] is the embedded implementation: tours kept in
//! insertion order, queried by evaluating [`DocumentQuery`] values and
//! [`Pipeline`]s against their JSON document form.
//!
//! Secret tours are invisible to every operation except [`count`]
//! and the unique-name check.
//!
//! [`count`]: TourRepository::count

mod engine;
mod error;
mod memory;
mod seed;

pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use memory::MemoryTourStore;
pub use seed::parse_seed;

use std::future::Future;

use crate::ids::TourId;
use crate::pipeline::Pipeline;
use crate::query::{DocumentQuery, Projection};
use crate::tour::{apply_virtuals, Document, Tour};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage operations on tours
///
/// # Example
///
/// ```rust,ignore
/// use tour_service::query::{QuerySpec, RawQuery};
/// use tour_service::store::{MemoryTourStore, TourRepository};
///
/// let store = MemoryTourStore::new();
/// let query = QuerySpec::new(RawQuery::from_pairs([("difficulty", "easy")]))
///     .filter()
///     .build();
/// let documents = store.find(&query).await?;
/// ```
pub trait TourRepository: Send + Sync + 'static {
    /// Run a filtered, sorted, windowed, projected query
    ///
    /// Returns rendered documents: projection applied, hidden fields
    /// dropped, derived fields added.
    fn find(&self, query: &DocumentQuery)
        -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Look up a visible tour
    fn find_by_id(&self, id: &TourId) -> impl Future<Output = StoreResult<Option<Tour>>> + Send;

    /// Add a tour; its name must be unused
    fn insert(&self, tour: Tour) -> impl Future<Output = StoreResult<Tour>> + Send;

    /// Rewrite the visible tour `id` with `apply` under one write lock
    ///
    /// `apply` receives the stored tour and returns its replacement, whose
    /// name must not belong to another tour. Returns `Ok(None)` when there
    /// is no such tour; an error from `apply` leaves the tour unchanged.
    fn update<F, E>(
        &self,
        id: &TourId,
        apply: F,
    ) -> impl Future<Output = Result<Option<Tour>, E>> + Send
    where
        F: FnOnce(&Tour) -> Result<Tour, E> + Send,
        E: From<StoreError> + Send;

    /// Remove a visible tour, returning it
    fn delete(&self, id: &TourId) -> impl Future<Output = StoreResult<Option<Tour>>> + Send;

    /// Run an aggregation pipeline over the visible tours
    fn aggregate(
        &self,
        pipeline: &Pipeline,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Number of stored tours
    fn count(&self) -> impl Future<Output = StoreResult<u64>> + Send;
}

/// Render a stored document for a response
///
/// Applies `projection`, drops hidden fields it does not name, and adds
/// derived fields.
pub fn render(document: &Document, projection: Option<&Projection>) -> Document {
    let mut rendered = engine::project(document, projection);
    apply_virtuals(&mut rendered);
    rendered
}
