//! Derived meteorological metrics
//!
//! Computes the read-only fields of an observation from its raw sensor
//! values:
//! - Feels-like temperature (wind chill, heat index, or raw temperature)
//! - Heat index (Steadman/Rothfusz regression, Celsius coefficients)
//! - Dew point (Magnus-Tetens approximation)
//! - 16-point compass label for the wind direction
//!
//! All functions are pure. Values that are undefined for the given input are
//! returned as `None`, never as a sentinel number. Range validation of the
//! raw fields happens before these functions are called.

use serde::Serialize;

use crate::db::models::RawObservation;

/// Wind chill applies at or below this temperature (°C)
pub const WIND_CHILL_MAX_TEMP_C: f64 = 10.0;

/// Wind chill applies above this wind speed (km/h)
pub const WIND_CHILL_MIN_WIND_KMH: f64 = 4.8;

/// Heat index is defined at or above this temperature (°C)
pub const HEAT_INDEX_MIN_TEMP_C: f64 = 27.0;

/// Magnus-Tetens constants
const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7;

/// Rothfusz regression coefficients for temperature in °C
const HEAT_INDEX_COEFFICIENTS: [f64; 9] = [
    -8.784_694_755_56,
    1.611_394_11,
    2.338_548_838_89,
    -0.146_116_05,
    -0.012_308_094,
    -0.016_424_827_777_8,
    0.002_211_732,
    0.000_725_46,
    -0.000_003_582,
];

/// Compass points, clockwise from north, 22.5° apart
const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Values derived from one raw observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub feels_like: f64,
    pub dew_point: Option<f64>,
    pub heat_index: Option<f64>,
    pub wind_direction_label: &'static str,
}

/// Compute all derived fields for a raw observation
///
/// Called by the persistence layer before every write, so that stored
/// derived values always match the raw values they were computed from.
pub fn compute_derived_metrics(raw: &RawObservation) -> DerivedMetrics {
    let humidity = raw.humidity_or_zero();
    let heat_index = heat_index(raw.temperature, humidity);

    DerivedMetrics {
        feels_like: feels_like(raw.temperature, raw.wind_speed, heat_index),
        dew_point: dew_point(raw.temperature, humidity),
        heat_index,
        wind_direction_label: wind_direction_label(raw.wind_direction),
    }
}

/// Feels-like temperature (°C, 2 decimals)
///
/// Wind chill when cold and windy, the heat index when hot (if defined),
/// otherwise the raw temperature.
pub fn feels_like(temp_c: f64, wind_kmh: f64, heat_index: Option<f64>) -> f64 {
    if temp_c <= WIND_CHILL_MAX_TEMP_C && wind_kmh > WIND_CHILL_MIN_WIND_KMH {
        return round2(wind_chill(temp_c, wind_kmh));
    }

    if temp_c >= HEAT_INDEX_MIN_TEMP_C {
        if let Some(hi) = heat_index {
            return round2(hi);
        }
    }

    round2(temp_c)
}

/// Environment Canada / NWS wind chill index (°C, unrounded)
///
/// `13.12 + 0.6215·T − 11.37·w^0.16 + 0.3965·T·w^0.16`
pub fn wind_chill(temp_c: f64, wind_kmh: f64) -> f64 {
    let w = wind_kmh.powf(0.16);
    13.12 + 0.6215 * temp_c - 11.37 * w + 0.3965 * temp_c * w
}

/// Heat index (°C, 2 decimals)
///
/// Defined only for `temp_c >= 27` and `humidity > 0`.
pub fn heat_index(temp_c: f64, humidity: f64) -> Option<f64> {
    if temp_c < HEAT_INDEX_MIN_TEMP_C || humidity <= 0.0 {
        return None;
    }

    let t = temp_c;
    let r = humidity;
    let c = HEAT_INDEX_COEFFICIENTS;
    let hi = c[0]
        + c[1] * t
        + c[2] * r
        + c[3] * t * r
        + c[4] * t * t
        + c[5] * r * r
        + c[6] * t * t * r
        + c[7] * t * r * r
        + c[8] * t * t * r * r;

    Some(round2(hi))
}

/// Dew point (°C, 2 decimals) via Magnus-Tetens
///
/// Undefined for `humidity <= 0` (the logarithm would not exist).
pub fn dew_point(temp_c: f64, humidity: f64) -> Option<f64> {
    if humidity <= 0.0 {
        return None;
    }

    let alpha = (MAGNUS_A * temp_c) / (MAGNUS_B + temp_c) + (humidity / 100.0).ln();
    Some(round2(MAGNUS_B * alpha / (MAGNUS_A - alpha)))
}

/// Map a wind direction in degrees to a 16-point compass label
///
/// `round(degrees / 22.5) mod 16`; negative and >360 inputs wrap around.
pub fn wind_direction_label(degrees: f64) -> &'static str {
    let normalized = degrees.rem_euclid(360.0);
    let index = (normalized / 22.5).round() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
