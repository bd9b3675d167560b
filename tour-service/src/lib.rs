//! # tour-service
//!
//! REST catalog of tours with a query-string translator and an embedded
//! document store.
//!
//! ## Features
//!
//! - **Query translation**: `?difficulty=easy&price[lt]=1500&sort=-price&fields=name,price&page=2`
//!   becomes a filter, a multi-key sort, a projection, and a skip/limit window
//! - **CRUD**: list, get, create, update, and delete tours under `/api/v1/tours`
//! - **Aggregations**: per-difficulty statistics and a monthly start plan
//! - **Schema validation**: typed casting and an ordered list of violations
//! - **Error envelopes**: one terminal stage renders every failure, with
//!   diagnostic detail in development only
//! - **Graceful shutdown**: SIGTERM and SIGINT drain in-flight requests
//!
//! ## Example
//!
//! ```rust,no_run
//! use tour_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::from_config(config.clone()).await?;
//!     let app = router(state);
//!
//!     Server::new(config).serve(app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;
pub mod tour;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, Environment, MiddlewareKind};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ApiError, ApiErrorKind, ApiOperation, Envelope};
    pub use crate::health::{health, readiness};
    pub use crate::ids::{MakeTypedRequestId, RequestId, TourId};
    pub use crate::observability::init_tracing;
    pub use crate::query::{DocumentQuery, QuerySpec, RawQuery};
    pub use crate::routes::{router, tour_routes, API_PREFIX};
    pub use crate::server::Server;
    pub use crate::state::AppState;
    pub use crate::store::{MemoryTourStore, StoreError, TourRepository};
    pub use crate::tour::{Tour, TourDraft, Violations};
}
