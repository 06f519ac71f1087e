//! atmos-seed: populate the database with demo cities and observations
//!
//! Observations go through the same write path as the API, so derived
//! metrics are computed exactly as for live data.

use anyhow::{Context, Result};
use atmos_common::db::models::{NewLocation, RawObservation};
use atmos_common::db::{locations, observations};
use atmos_server::bootstrap::{init_tracing, load_config, open_database};
use chrono::{DateTime, DurationRound, FixedOffset, TimeDelta, Utc};
use clap::Parser;
use std::f64::consts::PI;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "atmos-seed")]
#[command(about = "Seed the Atmos database with demo data")]
#[command(version)]
struct Args {
    /// Hourly observations to record per city, ending at the current hour
    #[arg(long, default_value_t = 48)]
    hours: u32,

    /// Delete every location (and its observations) first
    #[arg(long)]
    reset: bool,

    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[arg(short, long, env = "ATMOS_CONFIG")]
    config: Option<PathBuf>,
}

struct SeedCity {
    name: &'static str,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    mean_temp: f64,
    condition: &'static str,
    wind_kmh: f64,
    humidity: f64,
}

const CITIES: [SeedCity; 5] = [
    SeedCity {
        name: "Madrid",
        latitude: 40.4168,
        longitude: -3.7038,
        altitude: 667.0,
        mean_temp: 18.3,
        condition: "scattered clouds",
        wind_kmh: 7.6,
        humidity: 65.0,
    },
    SeedCity {
        name: "Barcelona",
        latitude: 41.3874,
        longitude: 2.1686,
        altitude: 12.0,
        mean_temp: 22.0,
        condition: "clear",
        wind_kmh: 16.2,
        humidity: 55.0,
    },
    SeedCity {
        name: "Valencia",
        latitude: 39.4699,
        longitude: -0.3763,
        altitude: 15.0,
        mean_temp: 15.7,
        condition: "rain",
        wind_kmh: 29.5,
        humidity: 85.0,
    },
    SeedCity {
        name: "Sevilla",
        latitude: 37.3891,
        longitude: -5.9845,
        altitude: 7.0,
        mean_temp: 24.5,
        condition: "clear",
        wind_kmh: 6.5,
        humidity: 48.0,
    },
    SeedCity {
        name: "Bilbao",
        latitude: 43.2630,
        longitude: -2.9350,
        altitude: 19.0,
        mean_temp: 12.1,
        condition: "overcast",
        wind_kmh: 19.1,
        humidity: 72.0,
    },
];

/// Daily swing around the mean, peaking mid-afternoon
const DIURNAL_AMPLITUDE_C: f64 = 5.0;
const PEAK_HOUR: f64 = 15.0;

impl SeedCity {
    fn observation(&self, observed_at: DateTime<FixedOffset>, local_hour: f64, step: u32) -> RawObservation {
        let phase = 2.0 * PI * (local_hour - PEAK_HOUR) / 24.0;
        let temperature = self.mean_temp + DIURNAL_AMPLITUDE_C * phase.cos();
        // Deterministic jitter so the series is not a perfect sinusoid
        let jitter = ((step * 37 % 11) as f64 - 5.0) / 10.0;

        RawObservation {
            observed_at,
            temperature: round1(temperature + jitter),
            humidity: Some((self.humidity - 10.0 * phase.cos()).clamp(5.0, 100.0).round()),
            pressure: 1013.25 + ((step % 7) as f64 - 3.0) * 0.4,
            wind_speed: round1(self.wind_kmh + jitter.abs() * 2.0),
            wind_direction: ((step * 15) % 360) as f64,
            wind_gust: Some(round1(self.wind_kmh * 1.5)),
            precipitation: if self.condition == "rain" { 0.4 } else { 0.0 },
            visibility: Some(10.0),
            cloud_cover: Some(match self.condition {
                "clear" => 5.0,
                "scattered clouds" => 40.0,
                _ => 90.0,
            }),
            condition: self.condition.to_string(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config)?;
    init_tracing(&config);

    let pool = open_database(args.root_folder, &config).await?;

    if args.reset {
        let removed = locations::delete_all(&pool).await?;
        info!("Removed {} existing locations", removed);
    }

    let offset = FixedOffset::east_opt(2 * 3600).context("invalid UTC offset")?;
    let now = Utc::now()
        .duration_trunc(TimeDelta::hours(1))
        .context("Failed to truncate current time")?;

    for city in &CITIES {
        let location = match locations::find_by_name(&pool, city.name).await? {
            Some(existing) => existing,
            None => {
                locations::create(
                    &pool,
                    &NewLocation {
                        name: city.name.to_string(),
                        latitude: city.latitude,
                        longitude: city.longitude,
                        altitude: Some(city.altitude),
                    },
                )
                .await?
            }
        };

        for step in 0..args.hours {
            let hours_back = i64::from(args.hours - 1 - step);
            let observed_at = (now - TimeDelta::hours(hours_back)).with_timezone(&offset);
            let local_hour = atmos_common::time::solar_hour(&observed_at.with_timezone(&Utc), city.longitude);
            observations::insert(&pool, location.id, &city.observation(observed_at, local_hour, step))
                .await
                .with_context(|| format!("Failed to record observation for {}", city.name))?;
        }

        info!(
            "{}: {} observations (location {})",
            city.name,
            observations::count(&pool, location.id).await?,
            location.id
        );
    }

    pool.close().await;
    info!("Seeding complete");
    Ok(())
}
