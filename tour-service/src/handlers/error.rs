//! API error types for handler operations
//!
//! Every handler failure is an [`ApiError`]. Its `IntoResponse` renders the
//! production envelope and stores the error in the response extensions;
//! [`render_errors`] is the terminal stage that re-renders it for the
//! configured [`Environment`] and logs it.
//!
//! # Example
//!
//! ```rust
//! use tour_service::handlers::{ApiError, ApiErrorKind, ApiOperation};
//!
//! let error = ApiError::malformed(ApiOperation::Get, "_id", "wwwww");
//! assert!(matches!(error.kind, ApiErrorKind::MalformedIdentifier));
//! assert_eq!(error.message, "Invalid _id: wwwww.");
//! ```

use std::fmt;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::Environment;
use crate::store::{StoreError, StoreErrorKind, StoreOperation};
use crate::tour::Violations;

/// Message shown in production for errors that are not operational
pub const GENERIC_ERROR_MESSAGE: &str = "Something went very wrong!";

/// Message for an identifier that matches no tour
pub const TOUR_NOT_FOUND_MESSAGE: &str = "No tour found with that ID";

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing tours
    List,
    /// Listing the cheapest well-rated tours
    TopCheap,
    /// Getting a single tour by ID
    Get,
    /// Creating a new tour
    Create,
    /// Updating an existing tour
    Update,
    /// Deleting a tour
    Delete,
    /// Computing per-difficulty statistics
    Stats,
    /// Computing the monthly start plan
    MonthlyPlan,
    /// Decoding the request body or query string
    Decode,
    /// Routing a request
    Route,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::TopCheap => write!(f, "top_cheap"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Stats => write!(f, "stats"),
            Self::MonthlyPlan => write!(f, "monthly_plan"),
            Self::Decode => write!(f, "decode"),
            Self::Route => write!(f, "route"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// No tour with the identifier, or no route for the path
    NotFound,
    /// Request body failed schema validation
    ValidationFailure,
    /// A unique field already holds the value
    DuplicateKey,
    /// An identifier or operand could not be cast to its field type
    MalformedIdentifier,
    /// Request body or query string could not be decoded
    BadRequest,
    /// Anything else; its message is hidden in production
    Unclassified,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailure => write!(f, "validation_failure"),
            Self::DuplicateKey => write!(f, "duplicate_key"),
            Self::MalformedIdentifier => write!(f, "malformed_identifier"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Unclassified => write!(f, "unclassified"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ValidationFailure
            | Self::DuplicateKey
            | Self::MalformedIdentifier
            | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unclassified => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error is an expected outcome of a bad request
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        !matches!(self, Self::Unclassified)
    }

    /// Envelope status: `fail` for client errors, `error` for server errors
    #[must_use]
    pub fn envelope_status(&self) -> &'static str {
        if self.status_code().is_server_error() {
            "error"
        } else {
            "fail"
        }
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Client-facing message
    pub message: String,
    /// Underlying cause, shown only in development
    pub detail: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// No visible tour has the requested identifier
    pub fn tour_not_found(operation: ApiOperation) -> Self {
        Self::new(operation, ApiErrorKind::NotFound, TOUR_NOT_FOUND_MESSAGE)
    }

    /// No route matches `path`
    pub fn route_not_found(path: impl fmt::Display) -> Self {
        Self::new(
            ApiOperation::Route,
            ApiErrorKind::NotFound,
            format!("Can't find {} on this server!", path),
        )
    }

    /// Body failed schema validation
    ///
    /// ```rust
    /// use tour_service::handlers::{ApiError, ApiOperation};
    /// use tour_service::tour::{Violation, Violations};
    ///
    /// let violations = Violations::from(vec![
    ///     Violation::new("name", "A tour must have a name"),
    ///     Violation::new("price", "A tour must have a price"),
    /// ]);
    /// let error = ApiError::validation(ApiOperation::Create, &violations);
    /// assert_eq!(
    ///     error.message,
    ///     "Invalid input data. A tour must have a name. A tour must have a price"
    /// );
    /// ```
    pub fn validation(operation: ApiOperation, violations: &Violations) -> Self {
        Self::new(
            operation,
            ApiErrorKind::ValidationFailure,
            format!("Invalid input data. {}", violations),
        )
    }

    /// A unique field already holds `value`
    pub fn duplicate_key(operation: ApiOperation, value: impl fmt::Display) -> Self {
        Self::new(
            operation,
            ApiErrorKind::DuplicateKey,
            format!("Duplicate field value: \"{}\". Please use another value!", value),
        )
    }

    /// `value` cannot be cast to the type of `path`
    pub fn malformed(operation: ApiOperation, path: &str, value: impl fmt::Display) -> Self {
        Self::new(
            operation,
            ApiErrorKind::MalformedIdentifier,
            format!("Invalid {}: {}.", path, value),
        )
    }

    /// Request could not be decoded
    pub fn bad_request(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::BadRequest, message)
    }

    /// Unexpected failure
    pub fn unclassified(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::Unclassified, message)
    }

    /// Translate a store failure raised while performing `operation`
    pub fn from_store(operation: ApiOperation, err: StoreError) -> Self {
        let detail = err.to_string();
        let error = match err.kind {
            StoreErrorKind::DuplicateKey => {
                Self::duplicate_key(operation, err.value.unwrap_or_default())
            }
            StoreErrorKind::CastFailed => Self::malformed(
                operation,
                err.field.as_deref().unwrap_or_default(),
                err.value.unwrap_or_default(),
            ),
            StoreErrorKind::InvalidQuery => Self::unclassified(operation, err.message),
        };
        error.with_detail(detail)
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Client-facing body for the given environment
    pub fn body(&self, environment: Environment) -> ApiErrorResponse {
        let status = self.kind.envelope_status();
        match environment {
            Environment::Production => ApiErrorResponse {
                status,
                message: if self.kind.is_operational() {
                    self.message.clone()
                } else {
                    GENERIC_ERROR_MESSAGE.to_string()
                },
                error: None,
                detail: None,
            },
            Environment::Development => ApiErrorResponse {
                status,
                message: self.message.clone(),
                error: Some(ErrorContext {
                    kind: self.kind.to_string(),
                    status_code: self.kind.status_code().as_u16(),
                    operation: self.operation.to_string(),
                }),
                detail: Some(self.detail.clone().unwrap_or_else(|| self.to_string())),
            },
        }
    }

    fn render(&self, environment: Environment) -> Response {
        (self.kind.status_code(), Json(self.body(environment))).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )
    }
}

impl std::error::Error for ApiError {}

/// Failure envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorResponse {
    /// `fail` or `error`
    pub status: &'static str,
    /// Client-facing message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error classification included in development responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    pub kind: String,
    pub status_code: u16,
    pub operation: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.render(Environment::Production);
        response.extensions_mut().insert(self);
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let operation = match err.operation {
            StoreOperation::Find | StoreOperation::Seed => ApiOperation::List,
            StoreOperation::Insert => ApiOperation::Create,
            StoreOperation::Update => ApiOperation::Update,
            StoreOperation::Aggregate => ApiOperation::Stats,
        };
        Self::from_store(operation, err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(ApiOperation::Decode, rejection.body_text())
            .with_detail(rejection.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(ApiOperation::Decode, rejection.body_text())
            .with_detail(rejection.to_string())
    }
}

/// Terminal error stage
///
/// Re-renders responses carrying an [`ApiError`] for the configured
/// environment. Use with `axum::middleware::from_fn_with_state`.
pub async fn render_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(error) = response.extensions_mut().remove::<ApiError>() else {
        return response;
    };

    if error.kind.is_operational() {
        tracing::debug!(
            operation = %error.operation,
            kind = %error.kind,
            detail = ?error.detail,
            "API error: {}", error.message
        );
    } else {
        tracing::error!(
            operation = %error.operation,
            kind = %error.kind,
            detail = ?error.detail,
            "API error: {}", error.message
        );
    }

    match environment {
        // already rendered in production form
        Environment::Production => response,
        Environment::Development => error.render(environment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::Violation;

    #[test]
    fn test_kind_status_codes() {
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiErrorKind::ValidationFailure.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::DuplicateKey.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::MalformedIdentifier.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiErrorKind::Unclassified.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_envelope_status() {
        assert_eq!(ApiErrorKind::NotFound.envelope_status(), "fail");
        assert_eq!(ApiErrorKind::Unclassified.envelope_status(), "error");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ApiError::route_not_found("/api/v2/tours").message,
            "Can't find /api/v2/tours on this server!"
        );
        assert_eq!(
            ApiError::duplicate_key(ApiOperation::Create, "The Forest Hiker").message,
            "Duplicate field value: \"The Forest Hiker\". Please use another value!"
        );
        assert_eq!(
            ApiError::tour_not_found(ApiOperation::Delete).message,
            "No tour found with that ID"
        );

        let violations = Violations::from(vec![Violation::new(
            "difficulty",
            "Difficulty is either: easy, medium, difficult",
        )]);
        assert_eq!(
            ApiError::validation(ApiOperation::Update, &violations).message,
            "Invalid input data. Difficulty is either: easy, medium, difficult"
        );
    }

    #[test]
    fn test_from_store_error() {
        let duplicate = StoreError::duplicate_key(StoreOperation::Update, "name", "The Sea Explorer");
        let error = ApiError::from(duplicate);
        assert_eq!(error.kind, ApiErrorKind::DuplicateKey);
        assert_eq!(error.operation, ApiOperation::Update);
        assert!(error.detail.as_deref().unwrap_or_default().contains("E11000"));

        let cast = StoreError::new(StoreOperation::Find, StoreErrorKind::CastFailed, "bad")
            .with_field("duration", "long");
        let error = ApiError::from_store(ApiOperation::TopCheap, cast);
        assert_eq!(error.kind, ApiErrorKind::MalformedIdentifier);
        assert_eq!(error.message, "Invalid duration: long.");
        assert_eq!(error.operation, ApiOperation::TopCheap);

        let skip = StoreError::invalid_query(StoreOperation::Find, "Skip value must be non-negative");
        assert_eq!(ApiError::from(skip).kind, ApiErrorKind::Unclassified);
    }

    #[test]
    fn test_production_body_hides_unclassified() {
        let error = ApiError::unclassified(ApiOperation::List, "disk on fire");
        let body = error.body(Environment::Production);
        assert_eq!(body.status, "error");
        assert_eq!(body.message, GENERIC_ERROR_MESSAGE);
        assert!(body.error.is_none());
        assert!(body.detail.is_none());

        let operational = ApiError::tour_not_found(ApiOperation::Get).body(Environment::Production);
        assert_eq!(operational.message, TOUR_NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_development_body_shows_everything() {
        let error = ApiError::unclassified(ApiOperation::List, "disk on fire").with_detail("io: EIO");
        let body = error.body(Environment::Development);
        assert_eq!(body.message, "disk on fire");
        assert_eq!(body.detail.as_deref(), Some("io: EIO"));
        let context = body.error.unwrap();
        assert_eq!(context.kind, "unclassified");
        assert_eq!(context.status_code, 500);
        assert_eq!(context.operation, "list");
    }

    #[test]
    fn test_development_body_serializes_camel_case() {
        let body = ApiError::tour_not_found(ApiOperation::Get).body(Environment::Development);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["statusCode"], 404);
        assert_eq!(json["status"], "fail");
    }

    #[test]
    fn test_into_response_keeps_error() {
        let response = ApiError::malformed(ApiOperation::Get, "_id", "abc").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let stored = response.extensions().get::<ApiError>().unwrap();
        assert_eq!(stored.kind, ApiErrorKind::MalformedIdentifier);
    }

    #[test]
    fn test_display() {
        let error = ApiError::malformed(ApiOperation::MonthlyPlan, "year", "abc");
        assert_eq!(
            error.to_string(),
            "API malformed_identifier error during monthly_plan: Invalid year: abc."
        );
    }
}
