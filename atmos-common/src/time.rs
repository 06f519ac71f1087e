//! Timestamp utilities

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};

/// Drop the offset and keep the wall-clock reading.
///
/// `2024-03-01T10:00:00+05:00` becomes `2024-03-01T10:00:00`; the offset is
/// discarded, not applied. Forecast fitting works in this naive clock domain.
pub fn strip_offset(ts: &DateTime<FixedOffset>) -> NaiveDateTime {
    ts.naive_local()
}

/// Approximate local solar hour (0.0..24.0) from a UTC instant and longitude
pub fn solar_hour(utc: &DateTime<Utc>, longitude: f64) -> f64 {
    let utc_hours = utc.hour() as f64 + utc.minute() as f64 / 60.0;
    (utc_hours + longitude / 15.0).rem_euclid(24.0)
}

/// Daytime when the local solar hour is in [06:00, 18:00)
pub fn is_daytime(observed_at: &DateTime<FixedOffset>, longitude: f64) -> bool {
    let hour = solar_hour(&observed_at.with_timezone(&Utc), longitude);
    (6.0..18.0).contains(&hour)
}
