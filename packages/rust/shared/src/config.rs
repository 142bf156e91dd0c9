//! Application configuration for frbsync.
//!
//! User config lives at `~/.frbsync/frbsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FrbSyncError, Result};
use crate::types::{DEFAULT_MATCH_RADIUS_ARCSEC, MergeMode};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "frbsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".frbsync";

// ---------------------------------------------------------------------------
// Config structs (matching frbsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Catalog location.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Duplicate matching.
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Mode used when the CLI is not told otherwise.
    #[serde(default)]
    pub mode: MergeMode,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the catalog database file.
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> String {
    "frbs.db".into()
}

/// `[matching]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Separation below which two positions are the same source.
    #[serde(default = "default_radius")]
    pub radius_arcsec: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            radius_arcsec: default_radius(),
        }
    }
}

fn default_radius() -> f64 {
    DEFAULT_MATCH_RADIUS_ARCSEC
}

impl AppConfig {
    /// Reject values no pipeline run could use.
    pub fn validate(&self) -> Result<()> {
        let r = self.matching.radius_arcsec;
        if !r.is_finite() || r <= 0.0 {
            return Err(FrbSyncError::config(format!(
                "matching.radius_arcsec must be a positive number, got {r}"
            )));
        }
        if self.catalog.path.trim().is_empty() {
            return Err(FrbSyncError::config("catalog.path must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sync config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Catalog database file.
    pub catalog_path: PathBuf,
    /// Match radius in arcseconds.
    pub match_radius_arcsec: f64,
    /// Dry-run or commit.
    pub mode: MergeMode,
}

impl From<&AppConfig> for SyncConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            catalog_path: PathBuf::from(&config.catalog.path),
            match_radius_arcsec: config.matching.radius_arcsec,
            mode: config.defaults.mode,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.frbsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FrbSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.frbsync/frbsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FrbSyncError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        FrbSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FrbSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FrbSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FrbSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
