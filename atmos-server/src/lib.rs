//! atmos-server library: HTTP surface of the Atmos weather service
//!
//! Handlers are thin. Validation of query strings happens here; derived
//! metrics, asset selection and forecasting live in `atmos-common`.

use atmos_common::config::{AssetsConfig, TomlConfig};
use atmos_common::db::SqliteHistory;
use atmos_common::{AssetSelector, ForecastEngine};
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod bootstrap;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub assets: Arc<AssetSelector>,
    pub emblem_base_url: Arc<str>,
    pub city_base_url: Arc<str>,
    pub forecast: Arc<ForecastEngine<SqliteHistory>>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &TomlConfig) -> Self {
        let AssetsConfig {
            emblem_base_url,
            city_base_url,
            ..
        } = &config.assets;

        let history = SqliteHistory::new(db.clone());
        Self {
            forecast: Arc::new(ForecastEngine::new(history, config.forecast.clone())),
            assets: Arc::new(config.assets.selector()),
            emblem_base_url: Arc::from(emblem_base_url.as_str()),
            city_base_url: Arc::from(city_base_url.as_str()),
            db,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::location_routes())
        .merge(api::observation_routes())
        .merge(api::weather_routes())
        .merge(api::forecast_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
