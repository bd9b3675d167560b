//! HTTP handlers for the tour resource
//!
//! - [`tours`]: one handler per route under `/api/v1/tours`
//! - [`Envelope`]: success bodies, `{"status": "success", "data": {...}}`
//! - [`ApiError`]: failure bodies, rendered by the [`render_errors`] stage
//!   according to the configured environment
//!
//! # Integration with Axum
//!
//! Handlers are generic over the store, so a router for any
//! [`TourRepository`](crate::store::TourRepository) is assembled the same way:
//!
//! ```rust,ignore
//! use axum::{routing::get, Router};
//! use tour_service::handlers::tours;
//!
//! let app: Router<AppState<MemoryTourStore>> = Router::new()
//!     .route("/tours", get(tours::list_tours).post(tours::create_tour));
//! ```

mod envelope;
mod error;
mod extract;
pub mod tours;

pub use envelope::{Envelope, SUCCESS_STATUS};
pub use error::{
    render_errors, ApiError, ApiErrorKind, ApiErrorResponse, ApiOperation, ErrorContext,
    GENERIC_ERROR_MESSAGE, TOUR_NOT_FOUND_MESSAGE,
};
pub use extract::{JsonBody, QueryPairs};
