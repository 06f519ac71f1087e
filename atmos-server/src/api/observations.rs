//! Observation recording and history

use atmos_common::db::models::{Observation, RawObservation};
use atmos_common::db::{locations, observations};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use super::params::{json_body, optional, path_id, required};
use crate::{ApiResult, AppState};

/// Body of POST /api/observations: raw values plus the owning location
#[derive(Debug, Deserialize)]
pub struct RecordObservationRequest {
    #[serde(alias = "location_id")]
    pub city_id: i64,
    #[serde(flatten)]
    pub raw: RawObservation,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub city_id: Option<String>,
    pub limit: Option<String>,
}

/// POST /api/observations
///
/// Cached forecasts for the location are dropped; a backfilled reading does
/// not move the newest observation time.
pub async fn record_observation(
    State(state): State<AppState>,
    payload: Result<Json<RecordObservationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Observation>)> {
    let request = json_body(payload)?;
    let stored = observations::insert(&state.db, request.city_id, &request.raw).await?;
    state.forecast.invalidate(stored.location_id).await;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// PUT /api/observations/:id
///
/// Replaces the raw values; derived fields are recomputed.
pub async fn update_observation(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RawObservation>, JsonRejection>,
) -> ApiResult<Json<Observation>> {
    let id = path_id(id)?;
    let raw = json_body(payload)?;

    let location_id = observations::location_of(&state.db, id).await?;
    let updated = observations::update(&state.db, id, &raw).await?;
    state.forecast.invalidate(location_id).await;
    Ok(Json(updated))
}

/// GET /api/observations?city_id=&limit=
pub async fn list_observations(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<Observation>>> {
    let city_id: i64 = required(params.city_id.as_deref(), "city_id")?;
    let limit = optional::<u32>(params.limit.as_deref(), "limit")?
        .unwrap_or(observations::DEFAULT_LIST_LIMIT);

    locations::require(&state.db, city_id).await?;
    Ok(Json(observations::list_recent(&state.db, city_id, limit).await?))
}

pub fn observation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/observations",
            get(list_observations).post(record_observation),
        )
        .route("/api/observations/:id", put(update_observation))
}
