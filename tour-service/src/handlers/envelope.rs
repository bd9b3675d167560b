//! Success envelopes
//!
//! Every successful response with a body has the shape
//! `{"status": "success", "result"?: <count>, "data": {<resource>: <value>}}`.
//!
//! ```rust
//! use tour_service::handlers::Envelope;
//! use serde_json::json;
//!
//! let envelope = Envelope::list("tours", vec![json!({"name": "The Forest Hiker"})]);
//! assert_eq!(envelope.result, Some(1));
//! assert_eq!(envelope.data["tours"][0]["name"], "The Forest Hiker");
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Envelope status of every success response
pub const SUCCESS_STATUS: &str = "success";

/// Success envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(skip)]
    pub status_code: StatusCode,
    pub status: &'static str,
    /// Number of items, on list responses only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<usize>,
    pub data: Map<String, Value>,
}

impl Envelope {
    fn new(status_code: StatusCode, resource: &str, value: Value, result: Option<usize>) -> Self {
        let mut data = Map::new();
        data.insert(resource.to_string(), value);
        Self {
            status_code,
            status: SUCCESS_STATUS,
            result,
            data,
        }
    }

    /// 200 with a single resource
    pub fn ok(resource: &str, value: impl Into<Value>) -> Self {
        Self::new(StatusCode::OK, resource, value.into(), None)
    }

    /// 200 with a list of resources and their count
    pub fn list(resource: &str, items: Vec<impl Into<Value>>) -> Self {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let count = items.len();
        Self::new(StatusCode::OK, resource, Value::Array(items), Some(count))
    }

    /// 201 with the created resource
    pub fn created(resource: &str, value: impl Into<Value>) -> Self {
        Self::new(StatusCode::CREATED, resource, value.into(), None)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}
