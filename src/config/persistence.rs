//! Configuration file persistence for tabshell
//!
//! This module resolves the platform-specific config directory, and loads
//! and saves the settings file with graceful fallback to defaults. The
//! session and recent-files records live in the same directory.

use crate::config::Settings;
use crate::error::{Error, Result, ResultExt};
use crate::store::write_record;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config directory
const APP_NAME: &str = "tabshell";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Session snapshot file name
const SESSION_FILE_NAME: &str = "session.json";

/// Recent files record name
const RECENT_FILE_NAME: &str = "recent.json";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory for the application.
///
/// Returns the appropriate directory based on the operating system:
/// - **Windows**: `%APPDATA%\tabshell\`
/// - **macOS**: `~/Library/Application Support/tabshell/`
/// - **Linux**: `~/.config/tabshell/`
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the config directory cannot be determined
/// (e.g., if the HOME environment variable is not set).
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the configuration file.
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the config directory cannot be determined.
pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the full path to the session snapshot record.
pub fn get_session_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(SESSION_FILE_NAME))
}

/// Get the full path to the recent files record.
pub fn get_recent_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(RECENT_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Load configuration from the default config file location.
///
/// If the file doesn't exist or is corrupted, it falls back to defaults.
///
/// # Behavior
///
/// 1. If the config file exists and is valid JSON, load and sanitize it
/// 2. If the config file doesn't exist, return default settings
/// 3. If the config file is corrupted/invalid, log a warning and return defaults
pub fn load_config() -> Settings {
    get_config_file_path()
        .and_then(|path| load_config_from(&path))
        .unwrap_or_warn_default(Settings::default(), "Failed to load configuration")
}

/// Load and sanitize the settings file at `config_path`.
///
/// A missing or blank file yields the defaults.
///
/// # Errors
///
/// - `Error::ConfigLoad`: the file exists but cannot be read
/// - `Error::ConfigParse`: the file is not valid settings JSON
pub fn load_config_from(config_path: &Path) -> Result<Settings> {
    if !config_path.exists() {
        debug!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
        return Ok(Settings::default());
    }

    debug!("Loading config from: {}", config_path.display());

    let contents = fs::read_to_string(config_path).map_err(|e| Error::ConfigLoad {
        path: config_path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Config file is empty, using defaults");
        return Ok(Settings::default());
    }

    let settings = Settings::from_json_sanitized(&contents).map_err(|e| {
        warn!(
            "Config file at {} contains invalid JSON: {}",
            config_path.display(),
            e
        );
        Error::ConfigParse {
            message: format!("Failed to parse config file: {}", e),
            source: Some(Box::new(e)),
        }
    })?;

    info!(
        "Configuration loaded successfully from {}",
        config_path.display()
    );
    Ok(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Save Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Save configuration to `config_path`.
///
/// The record is written atomically (sibling `.bak` file, then rename),
/// creating the config directory if needed.
///
/// # Errors
///
/// Returns `Error::ConfigSave` if the directory or file cannot be written.
pub fn save_config_to(config_path: &Path, settings: &Settings) -> Result<()> {
    debug!("Saving config to: {}", config_path.display());

    write_record(config_path, settings).map_err(|e| match e {
        Error::StoreWrite { path, source } => Error::ConfigSave { path, source },
        other => other,
    })?;

    info!(
        "Configuration saved successfully to {}",
        config_path.display()
    );
    Ok(())
}

/// Write `settings` to `config_path` unless a config file already exists.
///
/// Run on startup so a first run leaves an editable `config.json` with
/// every default spelled out. Returns `true` if a file was written.
pub fn save_config_if_missing(config_path: &Path, settings: &Settings) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }
    save_config_to(config_path, settings)?;
    Ok(true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
