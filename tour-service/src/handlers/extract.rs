//! Request extractors whose rejections are [`ApiError`]s

use axum::extract::{FromRequest, FromRequestParts, Query};
use axum::Json;
use serde::Deserialize;

use super::error::ApiError;

/// JSON request body; decoding failures become 400 `BadRequest`
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Decoded query string as `(key, value)` pairs in arrival order
#[derive(Debug, Deserialize, FromRequestParts)]
#[serde(transparent)]
#[from_request(via(Query), rejection(ApiError))]
pub struct QueryPairs(pub Vec<(String, String)>);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_query_pairs_keep_order_and_repeats() {
        let request = Request::builder()
            .uri("/tours?sort=price&duration%5Bgte%5D=5&sort=-name")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let QueryPairs(pairs) = QueryPairs::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(
            pairs,
            vec![
                ("sort".to_string(), "price".to_string()),
                ("duration[gte]".to_string(), "5".to_string()),
                ("sort".to_string(), "-name".to_string()),
            ]
        );
    }
}
