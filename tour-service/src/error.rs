//! Service-level error type
//!
//! Errors raised while starting the service: loading configuration, reading
//! seed data, binding the listener. Request-time failures use
//! [`ApiError`](crate::handlers::ApiError) instead.

use thiserror::Error;

use crate::store::StoreError;

/// Result alias for service startup and plumbing
pub type Result<T> = std::result::Result<T, Error>;

/// Service error
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Seed data could not be loaded into the store
    #[error("Seed error: {0}")]
    Seed(String),

    /// Store error surfaced outside a request
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
