//! Temperature forecasting from a location's observation history
//!
//! - [`model`]: deterministic additive model (trend + daily + weekly) fitted
//!   on the naive (offset-stripped) series
//! - [`engine`]: runs fits on the blocking pool with bounded concurrency, a
//!   timeout and a short-lived result cache
//!
//! An empty history yields an empty forecast. That is a normal outcome,
//! not an error.

pub mod cache;
pub mod engine;
pub mod model;

pub use engine::{ForecastEngine, HistorySource};
pub use model::{forecast_series, AdditiveModel};

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// One predicted future tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// Naive timestamp of the tick
    #[serde(rename = "ts")]
    pub timestamp: NaiveDateTime,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Spacing of forecast ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    #[serde(rename = "H")]
    Hourly,
    #[serde(rename = "D")]
    Daily,
    /// Fixed 7-day step from the last observation
    #[serde(rename = "W")]
    Weekly,
}

impl Frequency {
    pub fn step(self) -> TimeDelta {
        match self {
            Frequency::Hourly => TimeDelta::hours(1),
            Frequency::Daily => TimeDelta::days(1),
            Frequency::Weekly => TimeDelta::weeks(1),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Frequency::Hourly => "H",
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h" | "hourly" => Ok(Frequency::Hourly),
            "d" | "daily" => Ok(Frequency::Daily),
            "w" | "weekly" => Ok(Frequency::Weekly),
            other => Err(format!("unknown forecast frequency '{}'", other)),
        }
    }
}

/// Forecast failures
///
/// "No history" is not here: it is an empty `Vec`.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The model could not be fitted (e.g. a single observation)
    #[error("Forecast fit failed: {0}")]
    FitFailure(String),

    /// The fit did not finish within the configured timeout
    #[error("Forecast fit timed out after {0:?}")]
    Timeout(Duration),

    /// Requested horizon outside 1..=max_periods
    #[error("periods must be between 1 and {max}, got {requested}")]
    InvalidPeriods { requested: u32, max: u32 },

    /// Reading the observation history failed
    #[error("History unavailable: {0}")]
    History(#[from] crate::Error),

    /// The blocking fit task panicked or the worker pool is closed
    #[error("Forecast worker failed: {0}")]
    Worker(String),
}

impl ForecastError {
    /// Internal failures that may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ForecastError::FitFailure(_) | ForecastError::Timeout(_) | ForecastError::Worker(_)
        )
    }
}

/// Engine limits, loaded from the `[forecast]` TOML table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Largest accepted `periods`
    pub max_periods: u32,
    /// Concurrent fits
    pub workers: usize,
    pub fit_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_periods: 168,
            workers: 4,
            fit_timeout_secs: 10,
            cache_ttl_secs: 300,
            cache_capacity: 256,
        }
    }
}

impl EngineSettings {
    pub fn fit_timeout(&self) -> Duration {
        Duration::from_secs(self.fit_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("H".parse::<Frequency>().unwrap(), Frequency::Hourly);
        assert_eq!("hourly".parse::<Frequency>().unwrap(), Frequency::Hourly);
        assert_eq!(" d ".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_frequency_step() {
        assert_eq!(Frequency::Hourly.step(), TimeDelta::hours(1));
        assert_eq!(Frequency::Weekly.step(), TimeDelta::days(7));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ForecastError::FitFailure("x".into()).is_retryable());
        assert!(ForecastError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ForecastError::InvalidPeriods { requested: 0, max: 168 }.is_retryable());
    }

    #[test]
    fn test_forecast_point_serializes_ts() {
        let point = ForecastPoint {
            timestamp: NaiveDateTime::parse_from_str("2024-05-01 10:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            yhat: 20.0,
            yhat_lower: 19.0,
            yhat_upper: 21.0,
        };
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(json["ts"], "2024-05-01T10:00:00");
        assert_eq!(json["yhat_lower"], 19.0);
    }
}
