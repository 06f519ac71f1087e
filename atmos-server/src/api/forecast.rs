//! Temperature forecast endpoint

use atmos_common::db::locations;
use atmos_common::{ForecastPoint, Frequency};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::params::{optional, required};
use crate::{ApiError, ApiResult, AppState};

pub const DEFAULT_PERIODS: u32 = 24;

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub city_id: Option<String>,
    pub periods: Option<String>,
    pub freq: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub city_id: i64,
    pub periods: u32,
    pub freq: Frequency,
    pub points: Vec<ForecastPoint>,
}

/// GET /api/forecast/prophet/?city_id=&periods=&freq=
///
/// A location without observations gets an empty `points` list.
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> ApiResult<Json<ForecastResponse>> {
    let city_id: i64 = required(params.city_id.as_deref(), "city_id")?;
    let periods = optional::<u32>(params.periods.as_deref(), "periods")?.unwrap_or(DEFAULT_PERIODS);
    let freq = match params.freq.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(raw) => raw.parse::<Frequency>().map_err(ApiError::BadRequest)?,
        None => Frequency::default(),
    };

    let max = state.forecast.settings().max_periods;
    if periods < 1 || periods > max {
        return Err(ApiError::BadRequest(format!(
            "periods must be between 1 and {}, got {}",
            max, periods
        )));
    }

    locations::require(&state.db, city_id).await?;
    let points = state.forecast.forecast(city_id, periods, freq).await?;

    Ok(Json(ForecastResponse {
        city_id,
        periods,
        freq,
        points,
    }))
}

pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/api/forecast/prophet/", get(get_forecast))
        .route("/api/forecast/prophet", get(get_forecast))
}
