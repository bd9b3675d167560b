//! HTTP middleware stack
//!
//! The layers wrapped around the router come from `middleware.stack` in the
//! configuration, in request order: the first entry sees each request first
//! and each response last.

use std::any::Any;

use axum::{
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::{Config, MiddlewareKind},
    handlers::{ApiError, ApiOperation},
    ids::MakeTypedRequestId,
};

/// Sensitive headers that should be masked in logs
pub const SENSITIVE_HEADERS: [HeaderName; 5] = [
    http::header::AUTHORIZATION,
    http::header::COOKIE,
    http::header::SET_COOKIE,
    HeaderName::from_static("x-api-key"),
    HeaderName::from_static("x-auth-token"),
];

/// Create a request ID layer that generates type-safe request IDs.
///
/// Example format: `req_01h455vb4pex5vsknk084sn02q`
pub fn request_id_layer() -> SetRequestIdLayer<MakeTypedRequestId> {
    SetRequestIdLayer::x_request_id(MakeTypedRequestId)
}

/// Create a request ID propagation layer
pub fn request_id_propagation_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Create a sensitive headers layer
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    SetSensitiveRequestHeadersLayer::new(SENSITIVE_HEADERS)
}

/// Build CORS layer based on configuration
pub fn cors_layer(mode: &str) -> CorsLayer {
    match mode {
        "permissive" => CorsLayer::permissive(),
        "restrictive" => CorsLayer::new(),
        _ => {
            tracing::warn!("Unknown CORS mode: {}, defaulting to permissive", mode);
            CorsLayer::permissive()
        }
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("handler panicked");
    tracing::error!("Handler panicked: {}", message);

    ApiError::unclassified(ApiOperation::Route, message).into_response()
}

fn apply(router: Router, kind: MiddlewareKind, config: &Config) -> Router {
    match kind {
        MiddlewareKind::RequestId => router.layer(request_id_layer()),
        MiddlewareKind::PropagateRequestId => router.layer(request_id_propagation_layer()),
        MiddlewareKind::SensitiveHeaders => router.layer(sensitive_headers_layer()),
        MiddlewareKind::Trace => router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        ),
        MiddlewareKind::Cors => router.layer(cors_layer(&config.middleware.cors_mode)),
        MiddlewareKind::Compression => router.layer(CompressionLayer::new()),
        MiddlewareKind::Timeout => router.layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.service.timeout(),
        )),
        MiddlewareKind::BodyLimit => {
            router.layer(RequestBodyLimitLayer::new(config.middleware.body_limit_bytes()))
        }
        MiddlewareKind::CatchPanic => router.layer(CatchPanicLayer::custom(panic_response)),
    }
}

/// Wrap `router` in the configured middleware stack
///
/// The last layer added is the outermost, so the stack is applied back to
/// front.
pub fn apply_stack(router: Router, config: &Config) -> Router {
    config
        .middleware
        .stack
        .iter()
        .rev()
        .fold(router, |router, kind| apply(router, *kind, config))
}

/// Log middleware configuration for debugging
pub fn log_stack(config: &Config) {
    tracing::info!("Middleware configuration:");
    for (position, kind) in config.middleware.stack.iter().enumerate() {
        match kind {
            MiddlewareKind::BodyLimit => tracing::info!(
                "  {}. {} ({} KiB)",
                position + 1,
                kind,
                config.middleware.body_limit_kb
            ),
            MiddlewareKind::Timeout => tracing::info!(
                "  {}. {} ({} seconds)",
                position + 1,
                kind,
                config.service.timeout_secs
            ),
            MiddlewareKind::Cors => tracing::info!(
                "  {}. {} ({})",
                position + 1,
                kind,
                config.middleware.cors_mode
            ),
            _ => tracing::info!("  {}. {}", position + 1, kind),
        }
    }
}
