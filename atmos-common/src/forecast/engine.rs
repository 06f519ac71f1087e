//! Forecast engine: history lookup, bounded fitting and caching

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::cache::{CacheKey, ForecastCache};
use super::model::forecast_series;
use super::{EngineSettings, ForecastError, ForecastPoint, Frequency};
use crate::db::models::TemperatureSample;
use crate::time::strip_offset;

/// Where the engine reads a location's temperature history from
#[async_trait]
pub trait HistorySource: Send + Sync + 'static {
    /// All samples for the location, any order
    async fn temperature_history(&self, location_id: i64) -> crate::Result<Vec<TemperatureSample>>;

    /// Epoch milliseconds of the newest observation, `None` without history
    async fn latest_observation_ms(&self, location_id: i64) -> crate::Result<Option<i64>>;
}

/// Runs forecast fits off the async runtime
///
/// At most `workers` fits run at once. A fit that exceeds the timeout is
/// reported as [`ForecastError::Timeout`]; its blocking task keeps its worker
/// slot until it actually returns.
pub struct ForecastEngine<H> {
    history: H,
    settings: EngineSettings,
    fit_timeout: Duration,
    permits: Arc<Semaphore>,
    cache: ForecastCache,
}

impl<H: HistorySource> ForecastEngine<H> {
    pub fn new(history: H, settings: EngineSettings) -> Self {
        let workers = settings.workers.max(1);
        let cache = ForecastCache::new(settings.cache_ttl(), settings.cache_capacity);
        Self {
            history,
            fit_timeout: settings.fit_timeout(),
            settings,
            permits: Arc::new(Semaphore::new(workers)),
            cache,
        }
    }

    /// Override the configured fit timeout
    pub fn set_fit_timeout(&mut self, timeout: Duration) {
        self.fit_timeout = timeout;
    }

    /// Worker slots not held by a running fit
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Forget cached forecasts after a location's history changed
    pub async fn invalidate(&self, location_id: i64) {
        self.cache.invalidate(location_id).await;
    }

    /// Forecast `periods` ticks after the location's newest observation
    ///
    /// Returns an empty vector when the location has no observations.
    pub async fn forecast(
        &self,
        location_id: i64,
        periods: u32,
        frequency: Frequency,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let max = self.settings.max_periods;
        if periods == 0 || periods > max {
            return Err(ForecastError::InvalidPeriods {
                requested: periods,
                max,
            });
        }

        // Read before the history so a concurrent invalidate is detected
        let generation = self.cache.generation(location_id).await;

        let Some(latest_ms) = self.history.latest_observation_ms(location_id).await? else {
            debug!(location_id, "No observations, empty forecast");
            return Ok(Vec::new());
        };

        let key = CacheKey {
            location_id,
            periods,
            frequency,
            latest_ms,
        };
        if let Some(points) = self.cache.get(&key).await {
            debug!(location_id, periods, %frequency, "Forecast cache hit");
            return Ok(points.as_ref().clone());
        }

        let samples = self.history.temperature_history(location_id).await?;
        let mut series: Vec<_> = samples
            .iter()
            .map(|s| (strip_offset(&s.observed_at), s.temperature))
            .collect();
        series.sort_by_key(|(ts, _)| *ts);

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| ForecastError::Worker(e.to_string()))?;

        let sample_count = series.len();
        let fit = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            forecast_series(&series, periods, frequency)
        });

        let timeout = self.fit_timeout;
        let points = match tokio::time::timeout(timeout, fit).await {
            Err(_) => {
                warn!(location_id, ?timeout, "Forecast fit timed out");
                return Err(ForecastError::Timeout(timeout));
            }
            Ok(Err(join_error)) => {
                return Err(ForecastError::Worker(join_error.to_string()));
            }
            Ok(Ok(result)) => result?,
        };

        info!(
            location_id,
            samples = sample_count,
            periods,
            %frequency,
            "Forecast fitted"
        );

        let points = Arc::new(points);
        self.cache.insert(key, generation, Arc::clone(&points)).await;
        Ok(points.as_ref().clone())
    }
}
