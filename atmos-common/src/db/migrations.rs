//! Versioned schema migrations
//!
//! Each `migrate_vN` checks the current state before changing anything, so
//! running the full sequence twice is harmless. Never edit a released
//! migration; add a new one and bump [`CURRENT_SCHEMA_VERSION`].

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Latest applied version, 0 for a fresh database
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Apply every pending migration in order
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// v1: absolute-instant ordering column
///
/// Databases created before `observed_epoch_ms` existed only had the RFC 3339
/// text, which sorts wrongly across offsets. Add the column and backfill it.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if !column_exists(pool, "observations", "observed_epoch_ms").await? {
        sqlx::query(
            "ALTER TABLE observations ADD COLUMN observed_epoch_ms INTEGER NOT NULL DEFAULT 0",
        )
        .execute(pool)
        .await?;
        info!("Migration v1: Added observed_epoch_ms to observations");
    }

    let backfilled = sqlx::query(
        r#"
        UPDATE observations
        SET observed_epoch_ms = CAST(ROUND((julianday(observed_at) - 2440587.5) * 86400000.0) AS INTEGER)
        WHERE observed_epoch_ms = 0 AND julianday(observed_at) IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    if backfilled > 0 {
        info!("Migration v1: Backfilled observed_epoch_ms for {} rows", backfilled);
    }
    Ok(())
}

/// v2: index for per-location history scans
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_observations_location_epoch \
         ON observations(location_id, observed_epoch_ms)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    #[tokio::test]
    async fn test_fresh_database_is_current() {
        let pool = init_memory_database().await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = init_memory_database().await.unwrap();
        migrate_v1(&pool).await.unwrap();
        migrate_v2(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_v1_backfills_epoch_from_offset_text() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO locations (name, latitude, longitude) VALUES ('X', 0, 0)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO observations
                (location_id, observed_at, observed_epoch_ms, temperature, pressure,
                 wind_speed, wind_direction, feels_like)
            VALUES (1, '2024-05-01T12:00:00+02:00', 0, 20, 1013, 5, 90, 20)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        migrate_v1(&pool).await.unwrap();

        let epoch: i64 = sqlx::query_scalar("SELECT observed_epoch_ms FROM observations")
            .fetch_one(&pool)
            .await
            .unwrap();
        // 2024-05-01T10:00:00Z
        assert_eq!(epoch, 1_714_557_600_000);
    }
}
