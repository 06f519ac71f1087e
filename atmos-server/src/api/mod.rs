//! HTTP API handlers

pub mod buildinfo;
pub mod forecast;
pub mod health;
pub mod locations;
pub mod observations;
pub mod params;
pub mod weather;

pub use buildinfo::get_build_info;
pub use forecast::{forecast_routes, get_forecast};
pub use health::{health_check, health_routes};
pub use locations::location_routes;
pub use observations::observation_routes;
pub use weather::{get_conditions, get_current_weather, weather_routes};
