//! Deterministic additive forecast model
//!
//! `y(t) = trend(t) + daily(t) + weekly(t) + ε`
//!
//! - trend: least-squares line over hours since the first sample
//! - daily: centred mean residual per hour of day (history ≥ 2 days)
//! - weekly: centred mean residual per weekday (history ≥ 14 days)
//! - band: `z·σ·sqrt(1 + 1/n + (x − x̄)²/Sxx)` with z for an 80 % interval
//!
//! Fitting is pure and repeatable: the same series always yields the same
//! points.

use chrono::{Datelike, NaiveDateTime, Timelike};

use super::{ForecastError, ForecastPoint, Frequency};

/// Two-sided 80 % normal quantile
pub const INTERVAL_Z: f64 = 1.2816;

const DAILY_MIN_SPAN_HOURS: f64 = 48.0;
const WEEKLY_MIN_SPAN_HOURS: f64 = 14.0 * 24.0;

/// A fitted model
#[derive(Debug, Clone, PartialEq)]
pub struct AdditiveModel {
    origin: NaiveDateTime,
    n: usize,
    intercept: f64,
    slope: f64,
    x_mean: f64,
    sxx: f64,
    sigma: f64,
    daily: Option<[f64; 24]>,
    weekly: Option<[f64; 7]>,
}

impl AdditiveModel {
    /// Fit on a naive series; order of the input does not matter
    pub fn fit(series: &[(NaiveDateTime, f64)]) -> Result<Self, ForecastError> {
        let n = series.len();
        if n < 2 {
            return Err(ForecastError::FitFailure(format!(
                "need at least 2 observations, got {}",
                n
            )));
        }
        if let Some((ts, y)) = series.iter().find(|(_, y)| !y.is_finite()) {
            return Err(ForecastError::FitFailure(format!(
                "non-finite temperature {} at {}",
                y, ts
            )));
        }

        let origin = series
            .iter()
            .map(|(ts, _)| *ts)
            .min()
            .ok_or_else(|| ForecastError::FitFailure("empty series".to_string()))?;

        let xs: Vec<f64> = series.iter().map(|(ts, _)| hours_between(origin, *ts)).collect();
        let ys: Vec<f64> = series.iter().map(|(_, y)| *y).collect();

        let count = n as f64;
        let x_mean = xs.iter().sum::<f64>() / count;
        let y_mean = ys.iter().sum::<f64>() / count;
        let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
        if sxx <= f64::EPSILON {
            return Err(ForecastError::FitFailure(
                "all observations share one timestamp".to_string(),
            ));
        }
        let sxy: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (x - x_mean) * (y - y_mean))
            .sum();
        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let mut residuals: Vec<f64> = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| y - (intercept + slope * x))
            .collect();

        let span = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let daily = if span >= DAILY_MIN_SPAN_HOURS {
            let profile = seasonal_profile::<24>(series, &residuals, |ts| ts.hour() as usize);
            for ((ts, _), r) in series.iter().zip(residuals.iter_mut()) {
                *r -= profile[ts.hour() as usize];
            }
            Some(profile)
        } else {
            None
        };

        let weekly = if span >= WEEKLY_MIN_SPAN_HOURS {
            let profile = seasonal_profile::<7>(series, &residuals, weekday_index);
            for ((ts, _), r) in series.iter().zip(residuals.iter_mut()) {
                *r -= profile[weekday_index(ts)];
            }
            Some(profile)
        } else {
            None
        };

        let dof = n.saturating_sub(2).max(1) as f64;
        let sigma = (residuals.iter().map(|r| r * r).sum::<f64>() / dof).sqrt();

        Ok(Self {
            origin,
            n,
            intercept,
            slope,
            x_mean,
            sxx,
            sigma,
            daily,
            weekly,
        })
    }

    /// Predict one tick
    pub fn predict(&self, ts: NaiveDateTime) -> ForecastPoint {
        let x = hours_between(self.origin, ts);
        let mut yhat = self.intercept + self.slope * x;
        if let Some(daily) = &self.daily {
            yhat += daily[ts.hour() as usize];
        }
        if let Some(weekly) = &self.weekly {
            yhat += weekly[weekday_index(&ts)];
        }

        let widening = 1.0 + 1.0 / self.n as f64 + (x - self.x_mean).powi(2) / self.sxx;
        let half_width = INTERVAL_Z * self.sigma * widening.sqrt();

        ForecastPoint {
            timestamp: ts,
            yhat,
            yhat_lower: yhat - half_width,
            yhat_upper: yhat + half_width,
        }
    }

    /// Residual standard deviation
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Trend slope in °C per hour
    pub fn slope_per_hour(&self) -> f64 {
        self.slope
    }

    pub fn has_daily_seasonality(&self) -> bool {
        self.daily.is_some()
    }

    pub fn has_weekly_seasonality(&self) -> bool {
        self.weekly.is_some()
    }
}

/// `periods` ticks of `frequency` strictly after `last`
pub fn future_timestamps(
    last: NaiveDateTime,
    periods: u32,
    frequency: Frequency,
) -> Result<Vec<NaiveDateTime>, ForecastError> {
    (1..=periods)
        .map(|k| {
            i32::try_from(k)
                .ok()
                .and_then(|k| frequency.step().checked_mul(k))
                .and_then(|offset| last.checked_add_signed(offset))
                .ok_or_else(|| {
                    ForecastError::FitFailure(format!(
                        "forecast horizon of {} x {} overflows the calendar",
                        periods, frequency
                    ))
                })
        })
        .collect()
}

/// Fit on a naive history and predict `periods` future ticks
///
/// Empty history returns an empty forecast.
pub fn forecast_series(
    series: &[(NaiveDateTime, f64)],
    periods: u32,
    frequency: Frequency,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    let Some(last) = series.iter().map(|(ts, _)| *ts).max() else {
        return Ok(Vec::new());
    };

    let model = AdditiveModel::fit(series)?;
    let ticks = future_timestamps(last, periods, frequency)?;
    Ok(ticks.into_iter().map(|ts| model.predict(ts)).collect())
}

fn hours_between(origin: NaiveDateTime, ts: NaiveDateTime) -> f64 {
    (ts - origin).num_seconds() as f64 / 3600.0
}

fn weekday_index(ts: &NaiveDateTime) -> usize {
    ts.weekday().num_days_from_monday() as usize
}

/// Centred mean residual per bucket; empty buckets contribute zero
fn seasonal_profile<const N: usize>(
    series: &[(NaiveDateTime, f64)],
    residuals: &[f64],
    bucket: impl Fn(&NaiveDateTime) -> usize,
) -> [f64; N] {
    let mut sums = [0.0; N];
    let mut counts = [0usize; N];
    for ((ts, _), r) in series.iter().zip(residuals) {
        let b = bucket(ts);
        sums[b] += r;
        counts[b] += 1;
    }

    let mut profile = [0.0; N];
    let mut filled = 0usize;
    let mut total = 0.0;
    for b in 0..N {
        if counts[b] > 0 {
            profile[b] = sums[b] / counts[b] as f64;
            total += profile[b];
            filled += 1;
        }
    }

    if filled > 0 {
        let mean = total / filled as f64;
        for b in 0..N {
            if counts[b] > 0 {
                profile[b] -= mean;
            }
        }
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hourly(values: &[f64]) -> Vec<(NaiveDateTime, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, y)| (base() + TimeDelta::hours(i as i64), *y))
            .collect()
    }

    #[test]
    fn test_empty_series_yields_empty_forecast() {
        let points = forecast_series(&[], 5, Frequency::Hourly).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn test_single_point_is_fit_failure() {
        let result = forecast_series(&hourly(&[20.0]), 5, Frequency::Hourly);
        assert!(matches!(result, Err(ForecastError::FitFailure(_))));
    }

    #[test]
    fn test_identical_timestamps_is_fit_failure() {
        let series = vec![(base(), 10.0), (base(), 12.0), (base(), 11.0)];
        assert!(matches!(
            AdditiveModel::fit(&series),
            Err(ForecastError::FitFailure(_))
        ));
    }

    #[test]
    fn test_non_finite_temperature_is_fit_failure() {
        let series = hourly(&[10.0, f64::NAN, 12.0]);
        assert!(matches!(
            AdditiveModel::fit(&series),
            Err(ForecastError::FitFailure(_))
        ));
    }

    #[test]
    fn test_linear_series_extrapolates_trend() {
        // 20.0, 20.5, 21.0, ... like the original endpoint test data
        let values: Vec<f64> = (0..10).map(|i| 20.0 + i as f64 * 0.5).collect();
        let points = forecast_series(&hourly(&values), 5, Frequency::Hourly).unwrap();

        assert_eq!(points.len(), 5);
        for (k, point) in points.iter().enumerate() {
            let expected = 20.0 + (10 + k) as f64 * 0.5;
            assert!((point.yhat - expected).abs() < 1e-9);
            // Perfect fit: zero-width band
            assert!((point.yhat_upper - point.yhat_lower).abs() < 1e-9);
        }
    }

    #[test]
    fn test_points_are_ordered_and_bounded() {
        let values = [12.0, 13.5, 12.8, 14.1, 15.0, 14.2, 16.3, 15.9];
        let series = hourly(&values);
        let last = series.last().unwrap().0;
        let points = forecast_series(&series, 12, Frequency::Hourly).unwrap();

        assert_eq!(points.len(), 12);
        assert!(points[0].timestamp > last);
        assert_eq!(points[0].timestamp, last + TimeDelta::hours(1));
        for pair in points.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
        for point in &points {
            assert!(point.yhat_lower <= point.yhat);
            assert!(point.yhat <= point.yhat_upper);
        }
    }

    #[test]
    fn test_band_widens_with_horizon() {
        let values = [12.0, 13.5, 12.8, 14.1, 15.0, 14.2, 16.3, 15.9];
        let points = forecast_series(&hourly(&values), 24, Frequency::Hourly).unwrap();
        let first = points[0].yhat_upper - points[0].yhat_lower;
        let last = points[23].yhat_upper - points[23].yhat_lower;
        assert!(last > first);
    }

    #[test]
    fn test_two_points_are_enough() {
        let points = forecast_series(&hourly(&[10.0, 11.0]), 3, Frequency::Daily).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].timestamp, base() + TimeDelta::hours(1) + TimeDelta::days(1));
        assert!((points[0].yhat - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_unordered_input_uses_latest_timestamp() {
        let mut series = hourly(&[10.0, 11.0, 12.0, 13.0]);
        series.reverse();
        let points = forecast_series(&series, 2, Frequency::Hourly).unwrap();
        assert_eq!(points[0].timestamp, base() + TimeDelta::hours(4));
        assert!((points[0].yhat - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_seasonality_captured() {
        // Three days of a flat series with a warm afternoon
        let values: Vec<f64> = (0..72)
            .map(|h| if (12..18).contains(&(h % 24)) { 25.0 } else { 15.0 })
            .collect();
        let series = hourly(&values);
        let model = AdditiveModel::fit(&series).unwrap();
        assert!(model.has_daily_seasonality());
        assert!(!model.has_weekly_seasonality());

        let points = forecast_series(&series, 24, Frequency::Hourly).unwrap();
        let night = points[2].yhat; // 02:00
        let afternoon = points[14].yhat; // 14:00
        assert!(afternoon - night > 8.0);
    }

    #[test]
    fn test_short_history_has_no_seasonality() {
        let values: Vec<f64> = (0..24).map(|h| 10.0 + (h % 5) as f64).collect();
        let model = AdditiveModel::fit(&hourly(&values)).unwrap();
        assert!(!model.has_daily_seasonality());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let values: Vec<f64> = (0..100).map(|h| 10.0 + ((h * 7) % 13) as f64 * 0.3).collect();
        let series = hourly(&values);
        let first = forecast_series(&series, 10, Frequency::Hourly).unwrap();
        let second = forecast_series(&series, 10, Frequency::Hourly).unwrap();
        assert_eq!(first, second);
    }
}
