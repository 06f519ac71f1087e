//! Configuration loading and root folder resolution
//!
//! Two tiers:
//! 1. **Root folder**: where the database lives, resolved by priority
//!    (command line → `ATMOS_ROOT_FOLDER` → TOML `root_folder` → OS default)
//! 2. **TOML bootstrap**: bind address, logging, asset base URLs and forecast
//!    limits. A missing file is not an error; built-in defaults apply.

use crate::assets::{AssetSelector, EmblemCodes, PhotoTables};
use crate::forecast::EngineSettings;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "ATMOS_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "atmos.db";

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder (database location) when not given on the command line
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database file; defaults to `<root_folder>/atmos.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub forecast: EngineSettings,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            bind_addr: default_bind_addr(),
            logging: LoggingConfig::default(),
            assets: AssetsConfig::default(),
            forecast: EngineSettings::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One entry of the location photo table
#[derive(Debug, Clone, Deserialize)]
pub struct CityPhotoEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    pub code: String,
}

/// Asset CDN locations and lookup table overrides
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_emblem_base_url")]
    pub emblem_base_url: String,

    #[serde(default = "default_city_base_url")]
    pub city_base_url: String,

    #[serde(default)]
    pub emblems: EmblemCodes,

    /// Replaces the built-in location photo table when non-empty
    #[serde(default)]
    pub city_photos: Vec<CityPhotoEntry>,

    #[serde(default = "default_city_photo")]
    pub default_city_photo: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            emblem_base_url: default_emblem_base_url(),
            city_base_url: default_city_base_url(),
            emblems: EmblemCodes::default(),
            city_photos: Vec::new(),
            default_city_photo: default_city_photo(),
        }
    }
}

impl AssetsConfig {
    /// Build an asset selector from the configured tables
    pub fn selector(&self) -> AssetSelector {
        if self.city_photos.is_empty() {
            return AssetSelector::new(self.emblems.clone(), PhotoTables::default());
        }

        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for entry in &self.city_photos {
            if let Some(id) = entry.id {
                by_id.insert(id, entry.code.clone());
            }
            if let Some(name) = &entry.name {
                by_name.insert(name.clone(), entry.code.clone());
            }
        }

        AssetSelector::new(
            self.emblems.clone(),
            PhotoTables::new(by_id, by_name, self.default_city_photo.clone()),
        )
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_emblem_base_url() -> String {
    "https://cdn.example.com/emblems/".to_string()
}

fn default_city_base_url() -> String {
    "https://cdn.example.com/cities/".to_string()
}

fn default_city_photo() -> String {
    "default_city_01.jpg".to_string()
}

impl TomlConfig {
    /// Parse a TOML bootstrap file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the file if present; otherwise warn and use defaults
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Default location of the bootstrap TOML for this platform, if any exists
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("atmos").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/atmos/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `ATMOS_ROOT_FOLDER` environment variable
/// 3. `root_folder` key of the TOML config
/// 4. OS-dependent compiled default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_config(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("atmos"))
        .unwrap_or_else(|| PathBuf::from("./atmos_data"))
}

/// Creates the root folder and derives paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}
