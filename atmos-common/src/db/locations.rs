//! Location queries

use crate::db::models::{Location, NewLocation};
use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

const MAX_NAME_LEN: usize = 128;

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidLocation("name must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidLocation(format!(
            "name longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::InvalidLocation(format!(
            "latitude {} outside [-90, 90]",
            latitude
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::InvalidLocation(format!(
            "longitude {} outside [-180, 180]",
            longitude
        )));
    }
    Ok(())
}

pub async fn create(pool: &SqlitePool, new: &NewLocation) -> Result<Location> {
    let name = validate_name(&new.name)?;
    validate_coordinates(new.latitude, new.longitude)?;
    if let Some(altitude) = new.altitude {
        if !altitude.is_finite() {
            return Err(Error::InvalidLocation("altitude must be finite".to_string()));
        }
    }

    let id = sqlx::query(
        "INSERT INTO locations (name, latitude, longitude, altitude) VALUES (?, ?, ?, ?)",
    )
    .bind(&name)
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(new.altitude)
    .execute(pool)
    .await?
    .last_insert_rowid();

    info!(location_id = id, %name, "Created location");

    Ok(Location {
        id,
        name,
        latitude: new.latitude,
        longitude: new.longitude,
        altitude: new.altitude,
    })
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Location>> {
    let locations = sqlx::query_as::<_, Location>(
        "SELECT id, name, latitude, longitude, altitude FROM locations ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(locations)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Location>> {
    let location = sqlx::query_as::<_, Location>(
        "SELECT id, name, latitude, longitude, altitude FROM locations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(location)
}

/// Like [`get`], but a missing row is [`Error::LocationNotFound`]
pub async fn require(pool: &SqlitePool, id: i64) -> Result<Location> {
    get(pool, id).await?.ok_or(Error::LocationNotFound(id))
}

/// Case-insensitive, whitespace-trimmed name lookup; lowest id wins on ties
///
/// Names are compared after Unicode lowercasing in Rust, since SQLite's
/// NOCASE only folds ASCII letters.
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Location>> {
    let wanted = name.trim().to_lowercase();
    let location = list(pool)
        .await?
        .into_iter()
        .find(|location| location.name.to_lowercase() == wanted);
    Ok(location)
}

/// Names are the only mutable attribute of a location
pub async fn rename(pool: &SqlitePool, id: i64, name: &str) -> Result<Location> {
    let name = validate_name(name)?;
    let updated = sqlx::query("UPDATE locations SET name = ? WHERE id = ?")
        .bind(&name)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(Error::LocationNotFound(id));
    }

    info!(location_id = id, %name, "Renamed location");
    require(pool, id).await
}

/// Delete a location and, through the foreign key, all its observations
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::LocationNotFound(id));
    }

    info!(location_id = id, "Deleted location");
    Ok(())
}

/// Remove every location (and observation)
pub async fn delete_all(pool: &SqlitePool) -> Result<u64> {
    let deleted = sqlx::query("DELETE FROM locations")
        .execute(pool)
        .await?
        .rows_affected();
    Ok(deleted)
}
