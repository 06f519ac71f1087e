//! # Atmos Common Library
//!
//! Shared code for the Atmos weather service:
//! - Derived meteorological metrics (feels-like, dew point, heat index)
//! - Dashboard asset selection (weather emblem, location photo)
//! - Temperature forecasting from observation history
//! - Database models and queries
//! - Configuration loading

pub mod assets;
pub mod config;
pub mod db;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod time;

pub use assets::{AssetCode, AssetSelector};
pub use error::{Error, Result};
pub use forecast::{ForecastEngine, ForecastError, ForecastPoint, Frequency};
pub use metrics::{compute_derived_metrics, DerivedMetrics};
