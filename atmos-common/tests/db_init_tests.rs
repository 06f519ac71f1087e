//! On-disk database initialization

use atmos_common::db::init::init_database;
use atmos_common::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use atmos_common::db::models::{NewLocation, RawObservation};
use atmos_common::db::{locations, observations};
use chrono::DateTime;

#[tokio::test]
async fn test_database_created_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("atmos.db");
    assert!(!db_path.exists());

    let pool = init_database(&db_path).await.unwrap();

    assert!(db_path.exists(), "Database file was not created");
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_reopen_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("atmos.db");

    let pool = init_database(&db_path).await.unwrap();
    let location = locations::create(
        &pool,
        &NewLocation {
            name: "Bilbao".to_string(),
            latitude: 43.263,
            longitude: -2.935,
            altitude: None,
        },
    )
    .await
    .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let reopened = locations::get(&pool, location.id).await.unwrap();
    assert_eq!(reopened, Some(location));
}

#[tokio::test]
async fn test_cascade_applies_on_pooled_connections() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("atmos.db")).await.unwrap();

    let location = locations::create(
        &pool,
        &NewLocation {
            name: "Valencia".to_string(),
            latitude: 39.47,
            longitude: -0.376,
            altitude: None,
        },
    )
    .await
    .unwrap();

    for hour in 0..5 {
        let raw = RawObservation {
            observed_at: DateTime::parse_from_rfc3339(&format!("2024-06-01T{:02}:00:00+02:00", hour))
                .unwrap(),
            temperature: 20.0 + hour as f64,
            humidity: Some(55.0),
            pressure: 1015.0,
            wind_speed: 8.0,
            wind_direction: 90.0,
            wind_gust: None,
            precipitation: 0.0,
            visibility: None,
            cloud_cover: None,
            condition: "clear".to_string(),
        };
        observations::insert(&pool, location.id, &raw).await.unwrap();
    }
    assert_eq!(observations::count(&pool, location.id).await.unwrap(), 5);

    locations::delete(&pool, location.id).await.unwrap();
    assert_eq!(observations::count(&pool, location.id).await.unwrap(), 0);
}
