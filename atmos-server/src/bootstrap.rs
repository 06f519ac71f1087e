//! Startup shared by the server and seeding binaries

use anyhow::{Context, Result};
use atmos_common::config::{
    default_config_path, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use atmos_common::db::init_database;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Explicit path, else the platform default if one exists, else defaults
pub fn load_config(explicit: Option<PathBuf>) -> Result<TomlConfig> {
    let path = explicit.or_else(default_config_path);
    TomlConfig::load_or_default(path.as_deref()).context("Failed to load configuration")
}

/// `RUST_LOG` when set, otherwise the configured level
pub fn init_tracing(config: &TomlConfig) {
    let fallback = format!(
        "atmos_server={level},atmos_common={level},tower_http={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolve the database location and open it
pub async fn open_database(root_folder: Option<PathBuf>, config: &TomlConfig) -> Result<SqlitePool> {
    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => {
            let root_folder = RootFolderResolver::new()
                .with_cli_arg(root_folder)
                .with_config(config)
                .resolve();
            info!("Root folder: {}", root_folder.display());

            let initializer = RootFolderInitializer::new(root_folder);
            initializer
                .ensure_directory_exists()
                .context("Failed to create root folder")?;
            initializer.database_path()
        }
    };

    info!("Database path: {}", db_path.display());
    init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}
