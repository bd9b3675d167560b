//! Tour resource handlers
//!
//! Each handler translates the request, calls the store, and wraps the
//! outcome in an [`Envelope`]; failures surface as [`ApiError`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;

use super::envelope::Envelope;
use super::error::{ApiError, ApiOperation};
use super::extract::{JsonBody, QueryPairs};
use crate::ids::TourId;
use crate::pipeline;
use crate::query::{QuerySpec, RawQuery};
use crate::state::AppState;
use crate::store::{render, TourRepository};
use crate::tour::{apply_virtuals, fields, Document, TourDraft};

/// Page size of the top-five-cheap listing
pub const TOP_CHEAP_LIMIT: &str = "5";

/// Sort order of the top-five-cheap listing
///
/// `ratingAverage` names no stored field, so the listing is ordered by
/// price alone.
pub const TOP_CHEAP_SORT: &str = "-ratingAverage,price";

/// Fields of the top-five-cheap listing
pub const TOP_CHEAP_FIELDS: &str = "name,price,ratingsAverage,difficulty";

fn parse_id(raw: &str, operation: ApiOperation) -> Result<TourId, ApiError> {
    raw.parse::<TourId>().map_err(|err| {
        ApiError::malformed(operation, fields::ID, raw).with_detail(err.to_string())
    })
}

async fn find_tours<R: TourRepository>(
    state: &AppState<R>,
    raw: RawQuery,
    operation: ApiOperation,
) -> Result<Envelope, ApiError> {
    let query = QuerySpec::new(raw)
        .filter()
        .sort()
        .limit_fields()
        .paginate()
        .build();

    let tours = state
        .store()
        .find(&query)
        .await
        .map_err(|err| ApiError::from_store(operation, err))?;

    Ok(Envelope::list("tours", tours))
}

/// `GET /tours`
pub async fn list_tours<R: TourRepository>(
    State(state): State<AppState<R>>,
    QueryPairs(pairs): QueryPairs,
) -> Result<Envelope, ApiError> {
    find_tours(&state, RawQuery::from_pairs(pairs), ApiOperation::List).await
}

/// `GET /tours/top-5-cheap`
///
/// Presets `limit`, `sort`, and `fields`, overriding whatever the request
/// sent for them; filters and `page` pass through.
pub async fn top_five_cheap<R: TourRepository>(
    State(state): State<AppState<R>>,
    QueryPairs(pairs): QueryPairs,
) -> Result<Envelope, ApiError> {
    let raw = RawQuery::from_pairs(pairs)
        .with("limit", TOP_CHEAP_LIMIT)
        .with("sort", TOP_CHEAP_SORT)
        .with("fields", TOP_CHEAP_FIELDS);

    find_tours(&state, raw, ApiOperation::TopCheap).await
}

/// `GET /tours/{id}`
pub async fn get_tour<R: TourRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Envelope, ApiError> {
    let operation = ApiOperation::Get;
    let id = parse_id(&id, operation)?;

    let tour = state
        .store()
        .find_by_id(&id)
        .await
        .map_err(|err| ApiError::from_store(operation, err))?
        .ok_or_else(|| ApiError::tour_not_found(operation))?;

    Ok(Envelope::ok("tour", render(&tour.to_document(), None)))
}

/// `POST /tours`
pub async fn create_tour<R: TourRepository>(
    State(state): State<AppState<R>>,
    JsonBody(body): JsonBody<Document>,
) -> Result<Envelope, ApiError> {
    let operation = ApiOperation::Create;
    let tour = TourDraft::from_body(&body)
        .into_tour(TourId::new())
        .map_err(|violations| ApiError::validation(operation, &violations))?;

    let tour = state
        .store()
        .insert(tour)
        .await
        .map_err(|err| ApiError::from_store(operation, err))?;
    tracing::info!(id = %tour.id, name = %tour.name, "Tour created");

    // hidden fields are only hidden from reads
    let mut document = tour.to_document();
    apply_virtuals(&mut document);
    Ok(Envelope::created("tour", document))
}

/// `PATCH /tours/{id}`
pub async fn update_tour<R: TourRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<Document>,
) -> Result<Envelope, ApiError> {
    let operation = ApiOperation::Update;
    let id = parse_id(&id, operation)?;
    let store = state.store();

    let updated = store
        .update(&id, |existing| {
            existing
                .patched(&patch)
                .map_err(|violations| ApiError::validation(operation, &violations))
        })
        .await?
        .ok_or_else(|| ApiError::tour_not_found(operation))?;
    tracing::info!(id = %updated.id, "Tour updated");

    Ok(Envelope::ok("tour", render(&updated.to_document(), None)))
}

/// `DELETE /tours/{id}`
pub async fn delete_tour<R: TourRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let operation = ApiOperation::Delete;
    let id = parse_id(&id, operation)?;

    state
        .store()
        .delete(&id)
        .await
        .map_err(|err| ApiError::from_store(operation, err))?
        .ok_or_else(|| ApiError::tour_not_found(operation))?;
    tracing::info!(id = %id, "Tour deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /tours/tour-stats`
pub async fn tour_stats<R: TourRepository>(
    State(state): State<AppState<R>>,
) -> Result<Envelope, ApiError> {
    let stats = state
        .store()
        .aggregate(&pipeline::tour_stats())
        .await
        .map_err(|err| ApiError::from_store(ApiOperation::Stats, err))?;

    Ok(Envelope::ok("stats", Value::Array(stats.into_iter().map(Value::Object).collect())))
}

/// `GET /tours/monthly-plan/{year}`
pub async fn monthly_plan<R: TourRepository>(
    State(state): State<AppState<R>>,
    Path(year): Path<String>,
) -> Result<Envelope, ApiError> {
    let operation = ApiOperation::MonthlyPlan;
    let pipeline = year
        .parse::<i32>()
        .ok()
        .and_then(pipeline::monthly_plan)
        .ok_or_else(|| ApiError::malformed(operation, "year", &year))?;

    let plan = state
        .store()
        .aggregate(&pipeline)
        .await
        .map_err(|err| ApiError::from_store(operation, err))?;

    Ok(Envelope::ok("plan", Value::Array(plan.into_iter().map(Value::Object).collect())))
}
