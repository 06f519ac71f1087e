//! Location management

use atmos_common::db::locations;
use atmos_common::db::models::{Location, NewLocation};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::params::{json_body, path_id};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// GET /api/locations
pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Json<Vec<Location>>> {
    Ok(Json(locations::list(&state.db).await?))
}

/// POST /api/locations
pub async fn create_location(
    State(state): State<AppState>,
    payload: Result<Json<NewLocation>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Location>)> {
    let new = json_body(payload)?;
    let location = locations::create(&state.db, &new).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// PATCH /api/locations/:id
pub async fn rename_location(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> ApiResult<Json<Location>> {
    let id = path_id(id)?;
    let RenameRequest { name } = json_body(payload)?;
    Ok(Json(locations::rename(&state.db, id, &name).await?))
}

/// DELETE /api/locations/:id
///
/// Observations go with the location.
pub async fn delete_location(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = path_id(id)?;
    locations::delete(&state.db, id).await?;
    state.forecast.invalidate(id).await;
    info!(location_id = id, "Location removed with its observations");
    Ok(StatusCode::NO_CONTENT)
}

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/api/locations", get(list_locations).post(create_location))
        .route(
            "/api/locations/:id",
            patch(rename_location).delete(delete_location),
        )
}
