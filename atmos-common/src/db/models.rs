//! Database models

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A place that observations are recorded for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Payload for creating a location
#[derive(Debug, Clone, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
}

/// Raw sensor fields of one observation, as handed in by the caller.
///
/// Derived values are never part of this type; they are computed from it by
/// [`crate::metrics::compute_derived_metrics`] whenever it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Observation time with the offset it was recorded in
    pub observed_at: DateTime<FixedOffset>,
    /// Air temperature (°C)
    pub temperature: f64,
    /// Relative humidity (0-100 %); absent and zero both mean "unknown"
    #[serde(default)]
    pub humidity: Option<f64>,
    /// Pressure (hPa)
    pub pressure: f64,
    /// Wind speed (km/h)
    pub wind_speed: f64,
    /// Wind direction (degrees, 0-360)
    pub wind_direction: f64,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    /// Precipitation (mm)
    #[serde(default)]
    pub precipitation: f64,
    /// Visibility (km)
    #[serde(default)]
    pub visibility: Option<f64>,
    /// Cloud cover (%)
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    /// Free-text condition label ("clear", "rain", ...)
    #[serde(default)]
    pub condition: String,
}

impl RawObservation {
    /// Humidity with "absent" folded into zero
    pub fn humidity_or_zero(&self) -> f64 {
        self.humidity.unwrap_or(0.0)
    }
}

/// A stored observation with its derived fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub id: i64,
    pub location_id: i64,
    #[serde(flatten)]
    pub raw: RawObservation,
    pub feels_like: f64,
    pub dew_point: Option<f64>,
    pub heat_index: Option<f64>,
    pub wind_direction_label: String,
}

/// One (timestamp, temperature) sample of a location's history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSample {
    pub observed_at: DateTime<FixedOffset>,
    pub temperature: f64,
}
