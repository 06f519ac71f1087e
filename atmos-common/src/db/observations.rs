//! Observation queries
//!
//! Every write validates the raw values, then stores them together with the
//! derived metrics computed from them.

use crate::db::locations;
use crate::db::models::{Observation, RawObservation, TemperatureSample};
use crate::metrics::compute_derived_metrics;
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use sqlx::SqlitePool;
use tracing::debug;

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 500;

const SELECT_COLUMNS: &str = r#"
    SELECT id, location_id, observed_at, temperature, humidity, pressure,
           wind_speed, wind_direction, wind_gust, precipitation, visibility,
           cloud_cover, condition, feels_like, dew_point, heat_index,
           wind_direction_label
    FROM observations
"#;

#[derive(sqlx::FromRow)]
struct ObservationRow {
    id: i64,
    location_id: i64,
    observed_at: DateTime<FixedOffset>,
    temperature: f64,
    humidity: Option<f64>,
    pressure: f64,
    wind_speed: f64,
    wind_direction: f64,
    wind_gust: Option<f64>,
    precipitation: f64,
    visibility: Option<f64>,
    cloud_cover: Option<f64>,
    condition: String,
    feels_like: f64,
    dew_point: Option<f64>,
    heat_index: Option<f64>,
    wind_direction_label: String,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Observation {
            id: row.id,
            location_id: row.location_id,
            raw: RawObservation {
                observed_at: row.observed_at,
                temperature: row.temperature,
                humidity: row.humidity,
                pressure: row.pressure,
                wind_speed: row.wind_speed,
                wind_direction: row.wind_direction,
                wind_gust: row.wind_gust,
                precipitation: row.precipitation,
                visibility: row.visibility,
                cloud_cover: row.cloud_cover,
                condition: row.condition,
            },
            feels_like: row.feels_like,
            dew_point: row.dew_point,
            heat_index: row.heat_index,
            wind_direction_label: row.wind_direction_label,
        }
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(Error::InvalidObservation(format!(
            "{} {} outside [{}, {}]",
            field, value, min, max
        )));
    }
    Ok(())
}

fn check_optional(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<()> {
    match value {
        Some(value) => check_range(field, value, min, max),
        None => Ok(()),
    }
}

/// Reject raw values outside physical ranges
pub fn validate(raw: &RawObservation) -> Result<()> {
    check_range("temperature", raw.temperature, -100.0, 100.0)?;
    check_optional("humidity", raw.humidity, 0.0, 100.0)?;
    check_range("wind_direction", raw.wind_direction, 0.0, 360.0)?;
    check_range("wind_speed", raw.wind_speed, 0.0, f64::MAX)?;
    check_range("pressure", raw.pressure, 0.0, f64::MAX)?;
    check_range("precipitation", raw.precipitation, 0.0, f64::MAX)?;
    check_optional("wind_gust", raw.wind_gust, 0.0, f64::MAX)?;
    check_optional("visibility", raw.visibility, 0.0, f64::MAX)?;
    check_optional("cloud_cover", raw.cloud_cover, 0.0, 100.0)?;
    Ok(())
}

/// Record an observation for an existing location
pub async fn insert(pool: &SqlitePool, location_id: i64, raw: &RawObservation) -> Result<Observation> {
    validate(raw)?;
    locations::require(pool, location_id).await?;

    let derived = compute_derived_metrics(raw);

    let id = sqlx::query(
        r#"
        INSERT INTO observations
            (location_id, observed_at, observed_epoch_ms, temperature, humidity, pressure,
             wind_speed, wind_direction, wind_gust, precipitation, visibility, cloud_cover,
             condition, feels_like, dew_point, heat_index, wind_direction_label)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(location_id)
    .bind(raw.observed_at.to_rfc3339())
    .bind(raw.observed_at.timestamp_millis())
    .bind(raw.temperature)
    .bind(raw.humidity)
    .bind(raw.pressure)
    .bind(raw.wind_speed)
    .bind(raw.wind_direction)
    .bind(raw.wind_gust)
    .bind(raw.precipitation)
    .bind(raw.visibility)
    .bind(raw.cloud_cover)
    .bind(&raw.condition)
    .bind(derived.feels_like)
    .bind(derived.dew_point)
    .bind(derived.heat_index)
    .bind(derived.wind_direction_label)
    .execute(pool)
    .await?
    .last_insert_rowid();

    debug!(observation_id = id, location_id, "Recorded observation");

    Ok(Observation {
        id,
        location_id,
        raw: raw.clone(),
        feels_like: derived.feels_like,
        dew_point: derived.dew_point,
        heat_index: derived.heat_index,
        wind_direction_label: derived.wind_direction_label.to_string(),
    })
}

/// Replace the raw values of an observation and recompute its derived fields
pub async fn update(pool: &SqlitePool, id: i64, raw: &RawObservation) -> Result<Observation> {
    validate(raw)?;
    let derived = compute_derived_metrics(raw);

    let updated = sqlx::query(
        r#"
        UPDATE observations SET
            observed_at = ?, observed_epoch_ms = ?, temperature = ?, humidity = ?,
            pressure = ?, wind_speed = ?, wind_direction = ?, wind_gust = ?,
            precipitation = ?, visibility = ?, cloud_cover = ?, condition = ?,
            feels_like = ?, dew_point = ?, heat_index = ?, wind_direction_label = ?
        WHERE id = ?
        "#,
    )
    .bind(raw.observed_at.to_rfc3339())
    .bind(raw.observed_at.timestamp_millis())
    .bind(raw.temperature)
    .bind(raw.humidity)
    .bind(raw.pressure)
    .bind(raw.wind_speed)
    .bind(raw.wind_direction)
    .bind(raw.wind_gust)
    .bind(raw.precipitation)
    .bind(raw.visibility)
    .bind(raw.cloud_cover)
    .bind(&raw.condition)
    .bind(derived.feels_like)
    .bind(derived.dew_point)
    .bind(derived.heat_index)
    .bind(derived.wind_direction_label)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(Error::ObservationNotFound(id));
    }

    get(pool, id).await?.ok_or(Error::ObservationNotFound(id))
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Observation>> {
    let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
    let row = sqlx::query_as::<_, ObservationRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Observation::from))
}

/// Newest observation of a location by absolute instant
pub async fn latest(pool: &SqlitePool, location_id: i64) -> Result<Option<Observation>> {
    let sql = format!(
        "{} WHERE location_id = ? ORDER BY observed_epoch_ms DESC, id DESC LIMIT 1",
        SELECT_COLUMNS
    );
    let row = sqlx::query_as::<_, ObservationRow>(&sql)
        .bind(location_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Observation::from))
}

/// Latest-first history, `limit` clamped to `1..=MAX_LIST_LIMIT`
pub async fn list_recent(pool: &SqlitePool, location_id: i64, limit: u32) -> Result<Vec<Observation>> {
    let limit = limit.clamp(1, MAX_LIST_LIMIT);
    let sql = format!(
        "{} WHERE location_id = ? ORDER BY observed_epoch_ms DESC, id DESC LIMIT ?",
        SELECT_COLUMNS
    );
    let rows = sqlx::query_as::<_, ObservationRow>(&sql)
        .bind(location_id)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Observation::from).collect())
}

/// Full (timestamp, temperature) history, oldest first
pub async fn temperature_history(pool: &SqlitePool, location_id: i64) -> Result<Vec<TemperatureSample>> {
    let rows: Vec<(DateTime<FixedOffset>, f64)> = sqlx::query_as(
        r#"
        SELECT observed_at, temperature FROM observations
        WHERE location_id = ?
        ORDER BY observed_epoch_ms ASC, id ASC
        "#,
    )
    .bind(location_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(observed_at, temperature)| TemperatureSample {
            observed_at,
            temperature,
        })
        .collect())
}

pub async fn latest_epoch_ms(pool: &SqlitePool, location_id: i64) -> Result<Option<i64>> {
    let latest: Option<i64> =
        sqlx::query_scalar("SELECT MAX(observed_epoch_ms) FROM observations WHERE location_id = ?")
            .bind(location_id)
            .fetch_one(pool)
            .await?;
    Ok(latest)
}

pub async fn count(pool: &SqlitePool, location_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM observations WHERE location_id = ?")
        .bind(location_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Location an observation belongs to
pub async fn location_of(pool: &SqlitePool, id: i64) -> Result<i64> {
    let location_id: Option<i64> =
        sqlx::query_scalar("SELECT location_id FROM observations WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    location_id.ok_or(Error::ObservationNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use crate::db::models::NewLocation;

    async fn setup() -> (SqlitePool, i64) {
        let pool = init_memory_database().await.unwrap();
        let location = locations::create(
            &pool,
            &NewLocation {
                name: "Sevilla".to_string(),
                latitude: 37.3891,
                longitude: -5.9845,
                altitude: None,
            },
        )
        .await
        .unwrap();
        (pool, location.id)
    }

    fn raw(observed_at: &str, temperature: f64, humidity: Option<f64>) -> RawObservation {
        RawObservation {
            observed_at: DateTime::parse_from_rfc3339(observed_at).unwrap(),
            temperature,
            humidity,
            pressure: 1013.0,
            wind_speed: 10.0,
            wind_direction: 200.0,
            wind_gust: None,
            precipitation: 0.0,
            visibility: Some(10.0),
            cloud_cover: None,
            condition: "clear".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_computes_derived_fields() {
        let (pool, location_id) = setup().await;
        let stored = insert(&pool, location_id, &raw("2024-07-01T15:00:00+02:00", 35.0, Some(60.0)))
            .await
            .unwrap();

        assert!(stored.heat_index.is_some());
        assert_eq!(stored.feels_like, stored.heat_index.unwrap());
        assert!(stored.dew_point.is_some());
        assert_eq!(stored.wind_direction_label, "SSW");

        let fetched = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn test_insert_rejects_out_of_range() {
        let (pool, location_id) = setup().await;
        let too_hot = raw("2024-07-01T15:00:00Z", 150.0, None);
        assert!(matches!(
            insert(&pool, location_id, &too_hot).await,
            Err(Error::InvalidObservation(_))
        ));

        let soggy = raw("2024-07-01T15:00:00Z", 20.0, Some(120.0));
        assert!(matches!(
            insert(&pool, location_id, &soggy).await,
            Err(Error::InvalidObservation(_))
        ));

        let mut spun = raw("2024-07-01T15:00:00Z", 20.0, None);
        spun.wind_direction = 400.0;
        assert!(validate(&spun).is_err());
    }

    #[tokio::test]
    async fn test_insert_unknown_location() {
        let (pool, _) = setup().await;
        let result = insert(&pool, 999, &raw("2024-07-01T15:00:00Z", 20.0, None)).await;
        assert!(matches!(result, Err(Error::LocationNotFound(999))));
    }

    #[tokio::test]
    async fn test_update_recomputes_derived_fields() {
        let (pool, location_id) = setup().await;
        let stored = insert(&pool, location_id, &raw("2024-01-10T07:00:00Z", 20.0, Some(50.0)))
            .await
            .unwrap();
        assert!(stored.heat_index.is_none());

        let mut colder = raw("2024-01-10T07:00:00Z", -5.0, Some(50.0));
        colder.wind_speed = 20.0;
        colder.wind_direction = 0.0;
        let updated = update(&pool, stored.id, &colder).await.unwrap();

        assert_eq!(updated.raw.temperature, -5.0);
        assert!(updated.feels_like < -5.0);
        assert_eq!(updated.wind_direction_label, "N");

        assert!(matches!(
            update(&pool, 999, &colder).await,
            Err(Error::ObservationNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_ordering_uses_absolute_instant() {
        let (pool, location_id) = setup().await;
        // 10:00+05:00 is 05:00Z, earlier than 08:00Z despite the later wall clock
        insert(&pool, location_id, &raw("2024-05-01T08:00:00Z", 18.0, None)).await.unwrap();
        insert(&pool, location_id, &raw("2024-05-01T10:00:00+05:00", 12.0, None)).await.unwrap();
        insert(&pool, location_id, &raw("2024-05-01T06:00:00Z", 15.0, None)).await.unwrap();

        let history = temperature_history(&pool, location_id).await.unwrap();
        let temps: Vec<f64> = history.iter().map(|s| s.temperature).collect();
        assert_eq!(temps, vec![12.0, 15.0, 18.0]);

        let newest = latest(&pool, location_id).await.unwrap().unwrap();
        assert_eq!(newest.raw.temperature, 18.0);
        assert_eq!(
            latest_epoch_ms(&pool, location_id).await.unwrap(),
            Some(newest.raw.observed_at.timestamp_millis())
        );

        let recent = list_recent(&pool, location_id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].raw.temperature, 18.0);
    }

    #[tokio::test]
    async fn test_offset_survives_round_trip() {
        let (pool, location_id) = setup().await;
        let stored = insert(&pool, location_id, &raw("2024-05-01T10:00:00+05:00", 12.0, None))
            .await
            .unwrap();
        let fetched = get(&pool, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.raw.observed_at.offset().local_minus_utc(), 5 * 3600);
    }

    #[tokio::test]
    async fn test_empty_location_has_no_latest() {
        let (pool, location_id) = setup().await;
        assert!(latest(&pool, location_id).await.unwrap().is_none());
        assert_eq!(latest_epoch_ms(&pool, location_id).await.unwrap(), None);
        assert_eq!(count(&pool, location_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_location_cascades() {
        let (pool, location_id) = setup().await;
        insert(&pool, location_id, &raw("2024-05-01T08:00:00Z", 18.0, None)).await.unwrap();
        locations::delete(&pool, location_id).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM observations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
