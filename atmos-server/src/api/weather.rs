//! Current weather and dashboard conditions

use atmos_common::db::models::{Location, Observation};
use atmos_common::db::{locations, observations};
use atmos_common::time::is_daytime;
use atmos_common::{AssetCode, AssetSelector};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::{optional, required};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CityParams {
    pub city_id: Option<String>,
    pub city_name: Option<String>,
}

/// Latest observation of a location, flattened for the dashboard
#[derive(Debug, Serialize)]
pub struct CurrentWeather {
    pub city_id: i64,
    pub city_name: String,
    pub temperature: f64,
    pub condition: String,
    pub timestamp: DateTime<FixedOffset>,
    pub feels_like: f64,
    pub dew_point: Option<f64>,
    pub heat_index: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: f64,
    pub wind_direction_label: String,
}

impl CurrentWeather {
    fn new(location: Location, observation: Observation) -> Self {
        Self {
            city_id: location.id,
            city_name: location.name,
            temperature: observation.raw.temperature,
            condition: observation.raw.condition,
            timestamp: observation.raw.observed_at,
            feels_like: observation.feels_like,
            dew_point: observation.dew_point,
            heat_index: observation.heat_index,
            humidity: observation.raw.humidity,
            wind_speed: observation.raw.wind_speed,
            wind_direction_label: observation.wind_direction_label,
        }
    }
}

/// Dashboard header: condition, emblem and location photo
#[derive(Debug, Serialize)]
pub struct Conditions {
    pub city_id: i64,
    pub city_name: String,
    pub condition: String,
    pub temp_c: f64,
    pub is_daytime: bool,
    pub observed_at: DateTime<FixedOffset>,
    pub emblem_photo: AssetCode,
    pub emblem_photo_url: String,
    pub city_photo: AssetCode,
    pub city_photo_url: String,
}

async fn latest_for(state: &AppState, location: &Location) -> ApiResult<Observation> {
    observations::latest(&state.db, location.id)
        .await?
        .ok_or(ApiError::NoObservations(location.id))
}

/// GET /api/weather/current/?city_id=
pub async fn get_current_weather(
    State(state): State<AppState>,
    Query(params): Query<CityParams>,
) -> ApiResult<Json<CurrentWeather>> {
    let city_id: i64 = required(params.city_id.as_deref(), "city_id")?;
    let location = locations::require(&state.db, city_id).await?;
    let observation = latest_for(&state, &location).await?;
    Ok(Json(CurrentWeather::new(location, observation)))
}

/// GET /api/weather/conditions/?city_id=&city_name=
///
/// `city_id` wins when both are given; a bare `city_name` is looked up
/// case-insensitively.
pub async fn get_conditions(
    State(state): State<AppState>,
    Query(params): Query<CityParams>,
) -> ApiResult<Json<Conditions>> {
    let city_id: Option<i64> = optional(params.city_id.as_deref(), "city_id")?;
    let city_name = params
        .city_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let location = match (city_id, city_name) {
        (Some(id), _) => locations::require(&state.db, id).await?,
        (None, Some(name)) => locations::find_by_name(&state.db, name)
            .await?
            .ok_or_else(|| ApiError::LocationNameNotFound(name.to_string()))?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "one of 'city_id' or 'city_name' is required".to_string(),
            ))
        }
    };

    let observation = latest_for(&state, &location).await?;
    let raw = observation.raw;
    let daytime = is_daytime(&raw.observed_at, location.longitude);

    let emblem = state.assets.select_emblem(&raw.condition, raw.temperature, daytime);
    let photo = state
        .assets
        .select_location_photo(Some(location.id), Some(&location.name));
    debug!(location_id = location.id, %emblem, %photo, daytime, "Selected dashboard assets");

    Ok(Json(Conditions {
        city_id: location.id,
        city_name: location.name,
        condition: raw.condition,
        temp_c: raw.temperature,
        is_daytime: daytime,
        observed_at: raw.observed_at,
        emblem_photo_url: AssetSelector::asset_url(&state.emblem_base_url, &emblem),
        emblem_photo: emblem,
        city_photo_url: AssetSelector::asset_url(&state.city_base_url, &photo),
        city_photo: photo,
    }))
}

pub fn weather_routes() -> Router<AppState> {
    Router::new()
        .route("/api/weather/current/", get(get_current_weather))
        .route("/api/weather/current", get(get_current_weather))
        .route("/api/weather/conditions/", get(get_conditions))
        .route("/api/weather/conditions", get(get_conditions))
}
