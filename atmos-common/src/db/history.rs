//! SQLite-backed forecast history

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::models::TemperatureSample;
use crate::db::observations;
use crate::forecast::HistorySource;

/// Reads forecast input from the observations table
#[derive(Debug, Clone)]
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistorySource for SqliteHistory {
    async fn temperature_history(&self, location_id: i64) -> crate::Result<Vec<TemperatureSample>> {
        observations::temperature_history(&self.pool, location_id).await
    }

    async fn latest_observation_ms(&self, location_id: i64) -> crate::Result<Option<i64>> {
        observations::latest_epoch_ms(&self.pool, location_id).await
    }
}
