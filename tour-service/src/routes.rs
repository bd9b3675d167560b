//! Router assembly
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/api/v1/tours` | [`list_tours`](tours::list_tours) |
//! | POST | `/api/v1/tours` | [`create_tour`](tours::create_tour) |
//! | GET | `/api/v1/tours/top-5-cheap` | [`top_five_cheap`](tours::top_five_cheap) |
//! | GET | `/api/v1/tours/tour-stats` | [`tour_stats`](tours::tour_stats) |
//! | GET | `/api/v1/tours/monthly-plan/{year}` | [`monthly_plan`](tours::monthly_plan) |
//! | GET, PATCH, DELETE | `/api/v1/tours/{id}` | [`get_tour`](tours::get_tour), [`update_tour`](tours::update_tour), [`delete_tour`](tours::delete_tour) |
//! | GET | `/health`, `/ready` | liveness and readiness |
//!
//! Anything else, including a known path with an unsupported method, is a
//! 404 `fail` envelope.

use axum::{
    extract::OriginalUri,
    middleware,
    routing::get,
    Router,
};

use crate::{
    handlers::{render_errors, tours, ApiError},
    health::{health, readiness},
    state::AppState,
    store::TourRepository,
};

/// Version prefix of the tour API
pub const API_PREFIX: &str = "/api/v1";

/// Routes under `/tours`
pub fn tour_routes<R: TourRepository>() -> Router<AppState<R>> {
    Router::new()
        .route(
            "/tours",
            get(tours::list_tours::<R>).post(tours::create_tour::<R>),
        )
        .route("/tours/top-5-cheap", get(tours::top_five_cheap::<R>))
        .route("/tours/tour-stats", get(tours::tour_stats::<R>))
        .route("/tours/monthly-plan/{year}", get(tours::monthly_plan::<R>))
        .route(
            "/tours/{id}",
            get(tours::get_tour::<R>)
                .patch(tours::update_tour::<R>)
                .delete(tours::delete_tour::<R>),
        )
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    ApiError::route_not_found(path)
}

/// Complete application router, without the middleware stack
pub fn router<R: TourRepository>(state: AppState<R>) -> Router {
    let environment = state.environment();

    Router::new()
        .nest(API_PREFIX, tour_routes::<R>())
        .route("/health", get(health::<R>))
        .route("/ready", get(readiness::<R>))
        .method_not_allowed_fallback(route_not_found)
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(environment, render_errors))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Environment};
    use crate::ids::TourId;
    use crate::store::MemoryTourStore;
    use crate::tour::{Tour, TourDraft};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn tour(name: &str, difficulty: &str, price: u32, rating: f64, starts: &[&str]) -> Tour {
        let Value::Object(body) = json!({
            "name": name,
            "duration": 10,
            "maxGroupSize": 15,
            "difficulty": difficulty,
            "price": price,
            "ratingsAverage": rating,
            "ratingsQuantity": 8,
            "summary": "A tour worth taking",
            "imageCover": "cover.jpg",
            "startDates": starts,
        }) else {
            unreachable!()
        };
        TourDraft::from_body(&body).into_tour(TourId::new()).unwrap()
    }

    fn catalog() -> Vec<Tour> {
        vec![
            tour("The Forest Hiker", "easy", 397, 4.7, &["2021-04-25T09:00:00Z", "2021-07-20T09:00:00Z"]),
            tour("The Sea Explorer", "medium", 497, 4.8, &["2021-06-19T09:00:00Z"]),
            tour("The Snow Adventurer", "difficult", 2497, 4.5, &["2022-01-05T10:00:00Z"]),
            tour("The City Wanderer", "easy", 1197, 4.6, &["2021-04-11T10:00:00Z"]),
            tour("The Park Camper", "medium", 1497, 4.9, &["2021-08-05T10:00:00Z"]),
            tour("The Sports Lover", "difficult", 2997, 4.3, &["2021-09-19T10:00:00Z"]),
            tour("The Wine Taster", "easy", 1997, 4.4, &["2021-02-12T10:00:00Z"]),
        ]
    }

    fn app_with(environment: Environment, tours: Vec<Tour>) -> Router {
        let mut config = Config::default();
        config.service.environment = environment;
        let store = MemoryTourStore::with_tours(tours).unwrap();
        router(AppState::new(config, store))
    }

    fn app() -> Router {
        app_with(Environment::Production, catalog())
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        send(app, Method::GET, uri, None).await
    }

    fn names(body: &Value) -> Vec<&str> {
        body["data"]["tours"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect()
    }

    fn new_tour_body() -> Value {
        json!({
            "name": "The Northern Lights",
            "duration": 3,
            "maxGroupSize": 12,
            "difficulty": "easy",
            "price": 1497,
            "summary": "Enjoy the Northern Lights in one of the best places in the world",
            "imageCover": "tour-9-cover.jpg",
            "startDates": ["2021-12-16T10:00:00Z"]
        })
    }

    #[tokio::test]
    async fn test_list_all_tours() {
        let (status, body) = get(app(), "/api/v1/tours").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"], 7);

        let first = &body["data"]["tours"][0];
        assert!(first.get("__v").is_none());
        assert!(first.get("createdAt").is_none());
        assert_eq!(first["durationWeeks"], json!(10.0 / 7.0));
    }

    #[tokio::test]
    async fn test_list_filter_sort_fields() {
        let (status, body) = get(
            app(),
            "/api/v1/tours?difficulty=easy&price%5Blt%5D=1500&sort=-price&fields=name,price",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["The City Wanderer", "The Forest Hiker"]);

        let first = body["data"]["tours"][0].as_object().unwrap();
        let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["_id", "name", "price"]);
    }

    #[tokio::test]
    async fn test_list_repeated_key_is_membership() {
        let (_, body) = get(app(), "/api/v1/tours?difficulty=medium&difficulty=difficult&sort=price").await;
        assert_eq!(
            names(&body),
            vec!["The Sea Explorer", "The Park Camper", "The Snow Adventurer", "The Sports Lover"]
        );
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let (_, body) = get(app(), "/api/v1/tours?sort=price&page=2&limit=3").await;
        assert_eq!(body["result"], 3);
        assert_eq!(
            names(&body),
            vec!["The Park Camper", "The Wine Taster", "The Snow Adventurer"]
        );

        let (status, body) = get(app(), "/api/v1/tours?page=9&limit=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], 0);
    }

    #[tokio::test]
    async fn test_list_uncastable_operand_is_malformed() {
        let (status, body) = get(app(), "/api/v1/tours?duration%5Bgte%5D=long").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Invalid duration: long.");
    }

    #[tokio::test]
    async fn test_list_negative_page_is_unclassified() {
        let (status, body) = get(app(), "/api/v1/tours?page=-1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Something went very wrong!");
    }

    #[tokio::test]
    async fn test_top_five_cheap_overrides_request() {
        let (status, body) = get(app(), "/api/v1/tours/top-5-cheap?limit=50&sort=name").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], 5);
        assert_eq!(
            names(&body),
            vec![
                "The Forest Hiker",
                "The Sea Explorer",
                "The City Wanderer",
                "The Park Camper",
                "The Wine Taster"
            ]
        );

        let first = body["data"]["tours"][0].as_object().unwrap();
        assert!(first.contains_key("ratingsAverage"));
        assert!(first.contains_key("difficulty"));
        assert!(!first.contains_key("summary"));
    }

    #[tokio::test]
    async fn test_top_five_cheap_keeps_filters() {
        let (_, body) = get(app(), "/api/v1/tours/top-5-cheap?difficulty=easy").await;
        assert_eq!(
            names(&body),
            vec!["The Forest Hiker", "The City Wanderer", "The Wine Taster"]
        );
    }

    #[tokio::test]
    async fn test_tour_lifecycle() {
        let app = app_with(Environment::Production, Vec::new());

        let (status, body) = send(app.clone(), Method::POST, "/api/v1/tours", Some(new_tour_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        let tour = &body["data"]["tour"];
        let id = tour["_id"].as_str().unwrap().to_string();
        assert!(id.starts_with("tour_"));
        assert_eq!(tour["slug"], "the-northern-lights");
        assert_eq!(tour["ratingsAverage"], json!(4.5));
        assert_eq!(tour["secretTour"], json!(false));

        let uri = format!("/api/v1/tours/{}", id);
        let (status, body) = get(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tour"]["name"], "The Northern Lights");
        assert!(body["data"]["tour"].get("createdAt").is_none());

        let (status, body) = send(app.clone(), Method::PATCH, &uri, Some(json!({"price": 997}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tour"]["price"], 997);
        assert_eq!(body["data"]["tour"]["_id"], json!(id));

        let (status, body) = send(app.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = get(app, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No tour found with that ID");
    }

    #[tokio::test]
    async fn test_create_validation_failure() {
        let mut body = new_tour_body();
        body["difficulty"] = json!("extreme");
        body["priceDiscount"] = json!(2000);
        body.as_object_mut().unwrap().remove("name");

        let (status, response) = send(app(), Method::POST, "/api/v1/tours", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["status"], "fail");
        let message = response["message"].as_str().unwrap();
        assert!(message.starts_with("Invalid input data. A tour must have a name"), "{}", message);
        assert!(message.contains("Difficulty is either: easy, medium, difficult"));
        assert!(message.contains("Discount price (2000) should be below regular price"));
    }

    #[tokio::test]
    async fn test_create_duplicate_name() {
        let mut body = new_tour_body();
        body["name"] = json!("The Forest Hiker");

        let (status, response) = send(app(), Method::POST, "/api/v1/tours", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response["message"],
            "Duplicate field value: \"The Forest Hiker\". Please use another value!"
        );
    }

    #[tokio::test]
    async fn test_create_malformed_json() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/tours")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn test_update_validation_failure() {
        let tours = catalog();
        let id = tours[0].id.clone();
        let app = app_with(Environment::Production, tours);

        let uri = format!("/api/v1/tours/{}", id);
        let (status, body) = send(app, Method::PATCH, &uri, Some(json!({"ratingsAverage": 6}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid input data. Rating must be below 5.0");
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_ids() {
        let (status, body) = get(app(), "/api/v1/tours/wwwww").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid _id: wwwww.");

        let missing = format!("/api/v1/tours/{}", TourId::new());
        let (status, _) = send(app(), Method::DELETE, &missing, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(app(), Method::PATCH, &missing, Some(json!({"price": 1}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tour_stats() {
        let (status, body) = get(app(), "/api/v1/tours/tour-stats").await;
        assert_eq!(status, StatusCode::OK);

        let stats = body["data"]["stats"].as_array().unwrap();
        let groups: Vec<&str> = stats.iter().map(|s| s["_id"].as_str().unwrap()).collect();
        // ratings below 4.5 are excluded; sorted by average price
        assert_eq!(groups, vec!["EASY", "MEDIUM", "DIFFICULT"]);
        assert_eq!(stats[0]["numTours"], 2);
        assert_eq!(stats[0]["numRatings"], 16);
        assert_eq!(stats[0]["minPrice"], 397);
        assert_eq!(stats[0]["maxPrice"], 1197);
        assert_eq!(stats[2]["numTours"], 1);
    }

    #[tokio::test]
    async fn test_monthly_plan() {
        let (status, body) = get(app(), "/api/v1/tours/monthly-plan/2021").await;
        assert_eq!(status, StatusCode::OK);

        let plan = body["data"]["plan"].as_array().unwrap();
        assert_eq!(plan[0]["month"], 4);
        assert_eq!(plan[0]["numTourStarts"], 2);
        assert!(plan[0].get("_id").is_none());
        assert!(plan.len() <= 12);
        assert!(plan.iter().all(|month| month["month"] != 1));
    }

    #[tokio::test]
    async fn test_monthly_plan_bad_year() {
        let (status, body) = get(app(), "/api/v1/tours/monthly-plan/twenty").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid year: twenty.");

        for year in ["10000", "-1"] {
            let (status, body) = get(app(), &format!("/api/v1/tours/monthly-plan/{}", year)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], format!("Invalid year: {}.", year));
        }
    }

    #[tokio::test]
    async fn test_secret_tours_hidden() {
        let mut tours = catalog();
        let mut secret = tour("The Hidden Valley", "easy", 10, 5.0, &["2021-04-01T10:00:00Z"]);
        secret.secret_tour = true;
        let secret_id = secret.id.clone();
        tours.push(secret);
        let app = app_with(Environment::Production, tours);

        let (_, body) = get(app.clone(), "/api/v1/tours?price%5Blt%5D=100").await;
        assert_eq!(body["result"], 0);

        let (status, _) = get(app.clone(), &format!("/api/v1/tours/{}", secret_id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = get(app, "/api/v1/tours/tour-stats").await;
        let easy = body["data"]["stats"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["_id"] == "EASY")
            .cloned()
            .unwrap();
        assert_eq!(easy["minPrice"], 397);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = get(app(), "/api/v2/tours?x=1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Can't find /api/v2/tours?x=1 on this server!");
    }

    #[tokio::test]
    async fn test_unsupported_method_is_route_not_found() {
        let id = catalog()[0].id.to_string();
        let cases = [
            (Method::PUT, "/api/v1/tours".to_string()),
            (Method::PATCH, "/api/v1/tours/top-5-cheap".to_string()),
            (Method::POST, format!("/api/v1/tours/{}", id)),
            (Method::DELETE, "/health".to_string()),
        ];

        for (method, uri) in cases {
            let (status, body) = send(app(), method.clone(), &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
            assert_eq!(body["status"], "fail");
            assert_eq!(body["message"], format!("Can't find {} on this server!", uri));
        }
    }

    #[tokio::test]
    async fn test_development_errors_carry_detail() {
        let app = app_with(Environment::Development, catalog());

        let (status, body) = get(app.clone(), "/api/v1/tours?page=-1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["message"],
            "Skip value must be non-negative, but received: -200"
        );
        assert_eq!(body["error"]["kind"], "unclassified");
        assert_eq!(body["error"]["statusCode"], 500);
        assert_eq!(body["error"]["operation"], "list");
        assert!(body["detail"].as_str().unwrap().contains("invalid_query"));

        let (status, body) = get(app, "/api/v1/tours/wwwww").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["operation"], "get");
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (status, body) = get(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = get(app(), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dependencies"]["store"]["message"], "7 tours");
    }
}
