//! Configuration loading
//!
//! Resolution follows the usual priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The binary parses its CLI flags and passes them in as [`ConfigOverrides`];
//! this module never touches argv itself.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default listen port for topfive-server
pub const DEFAULT_PORT: u16 = 5750;

/// Environment variable names recognized by [`load`]
pub mod env_keys {
    pub const CONFIG_FILE: &str = "TOPFIVE_CONFIG";
    pub const PORT: &str = "TOPFIVE_PORT";
    pub const CHART_DIR: &str = "TOPFIVE_CHART_DIR";
    pub const CHART_BASE_URL: &str = "TOPFIVE_CHART_BASE_URL";
    pub const CACHE_DB: &str = "TOPFIVE_CACHE_DB";
    pub const CATALOG_CLIENT_ID: &str = "TOPFIVE_CATALOG_CLIENT_ID";
    pub const CATALOG_CLIENT_SECRET: &str = "TOPFIVE_CATALOG_CLIENT_SECRET";
}

/// Raw TOML configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub chart_dir: Option<PathBuf>,
    pub chart_base_url: Option<String>,
    pub cache_db: Option<PathBuf>,
    #[serde(default)]
    pub catalog: TomlCatalogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlCatalogConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: Option<String>,
    pub token_url: Option<String>,
    pub search_delay_ms: Option<u64>,
}

/// External catalog (search API + token endpoint) settings
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
    pub token_url: String,
    /// Fixed delay applied after each live search call
    pub search_delay_ms: u64,
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding `valid_dates.json` and `date/<YYYY-MM-DD>.json`
    pub chart_dir: PathBuf,
    /// HTTP fallback for chart documents not present on disk
    pub chart_base_url: Option<String>,
    /// Durable cache store; `None` disables caching entirely
    pub cache_db_path: Option<PathBuf>,
    pub catalog: CatalogConfig,
    /// Upper bound on the backward streak walk, in weeks
    pub streak_max_weeks: usize,
}

/// CLI-provided overrides, already parsed by the binary
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub chart_dir: Option<PathBuf>,
    pub cache_db: Option<PathBuf>,
}

/// Load the server configuration with the documented priority order.
pub fn load(overrides: &ConfigOverrides) -> Result<ServerConfig> {
    let toml_config = load_toml_config(overrides.config_file.as_deref())?;

    let port = overrides
        .port
        .or_else(|| env_parsed(env_keys::PORT))
        .or(toml_config.port)
        .unwrap_or(DEFAULT_PORT);

    let chart_dir = overrides
        .chart_dir
        .clone()
        .or_else(|| std::env::var(env_keys::CHART_DIR).ok().map(PathBuf::from))
        .or(toml_config.chart_dir.clone())
        .ok_or_else(|| {
            Error::Config(format!(
                "chart directory not configured (set {} or chart_dir in the config file)",
                env_keys::CHART_DIR
            ))
        })?;

    let chart_base_url = std::env::var(env_keys::CHART_BASE_URL)
        .ok()
        .or(toml_config.chart_base_url.clone());

    let cache_db_path = overrides
        .cache_db
        .clone()
        .or_else(|| std::env::var(env_keys::CACHE_DB).ok().map(PathBuf::from))
        .or(toml_config.cache_db.clone());

    let catalog = CatalogConfig {
        client_id: std::env::var(env_keys::CATALOG_CLIENT_ID)
            .ok()
            .or(toml_config.catalog.client_id.clone())
            .unwrap_or_default(),
        client_secret: std::env::var(env_keys::CATALOG_CLIENT_SECRET)
            .ok()
            .or(toml_config.catalog.client_secret.clone())
            .unwrap_or_default(),
        api_base_url: toml_config
            .catalog
            .api_base_url
            .clone()
            .unwrap_or_else(|| "https://api.spotify.com/v1".to_string()),
        token_url: toml_config
            .catalog
            .token_url
            .clone()
            .unwrap_or_else(|| "https://accounts.spotify.com/api/token".to_string()),
        search_delay_ms: toml_config.catalog.search_delay_ms.unwrap_or(80),
    };

    Ok(ServerConfig {
        host: toml_config.host.unwrap_or_else(|| "127.0.0.1".to_string()),
        port,
        chart_dir,
        chart_base_url,
        cache_db_path,
        catalog,
        streak_max_weeks: 52,
    })
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Read the TOML config file if one is present.
///
/// Explicit path (CLI) > `TOPFIVE_CONFIG` env var > the platform config
/// directory. A missing default file is not an error; a named file that
/// cannot be read or parsed is.
fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let named = explicit
        .map(PathBuf::from)
        .or_else(|| std::env::var(env_keys::CONFIG_FILE).ok().map(PathBuf::from));

    let path = match named {
        Some(path) => path,
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(TomlConfig::default()),
        },
    };
    tracing::debug!("Loading config file: {}", path.display());

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
}

/// Platform config file location, e.g. `~/.config/topfive/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("topfive").join("config.toml"))
}
