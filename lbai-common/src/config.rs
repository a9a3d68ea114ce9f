//! Configuration loading and root folder resolution
//!
//! Bootstrap settings follow a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup: the caller gets a
//! warning and the compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LBAI_ROOT_FOLDER";

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "lyricbeats";

/// Database file created inside the root folder
pub const DATABASE_FILE_NAME: &str = "lbai.db";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\lyricbeats
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\lyricbeats"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/lyricbeats
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/lyricbeats"))
    } else {
        // ~/.local/share/lyricbeats
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./lyricbeats_data"))
    }
}

/// Default TOML config path for a module: `<config dir>/lyricbeats/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(format!("{}.toml", module_name)))
}

/// Load a TOML config file, falling back to `T::default()`
///
/// Missing file → info + defaults. Unreadable or malformed file → warning +
/// defaults. Never fails.
pub fn load_toml_or_default<T>(path: Option<&Path>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No config file location available, using compiled defaults");
        return T::default();
    };

    if !path.exists() {
        info!("Config file not found at {}, using compiled defaults", path.display());
        return T::default();
    }

    match read_toml(path) {
        Ok(config) => {
            info!("Loaded config file: {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using compiled defaults", e);
            T::default()
        }
    }
}

/// Read and parse a TOML file
pub fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    Environment,
    Toml,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingSource::Environment => write!(f, "environment"),
            SettingSource::Toml => write!(f, "TOML"),
        }
    }
}

/// Resolve a string setting from ENV → TOML
///
/// Empty or whitespace-only values count as absent. The value itself is never
/// logged, only its source, so this is safe for tokens and API keys.
pub fn resolve_setting(
    name: &str,
    env_var: &str,
    toml_value: Option<&str>,
) -> Option<(String, SettingSource)> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_value(v));
    let toml_value = toml_value.filter(|v| is_valid_value(v)).map(str::to_string);

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment ({}) and TOML. Using environment (higher priority).",
            name, env_var
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", name);
        return Some((value, SettingSource::Environment));
    }

    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", name);
        return Some((value, SettingSource::Toml));
    }

    None
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Root folder resolution following CLI → ENV → TOML → default
pub struct RootFolderResolver {
    module_name: String,
    cli_override: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_override: None,
            toml_root: None,
        }
    }

    /// Command-line value (highest priority)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_override = path;
        self
    }

    /// `root_folder` from an already-loaded TOML config
    pub fn with_toml_root(mut self, path: Option<PathBuf>) -> Self {
        self.toml_root = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_override {
            info!("[{}] Root folder from command line: {}", self.module_name, path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if is_valid_value(&path) {
                info!("[{}] Root folder from {}: {}", self.module_name, ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            info!("[{}] Root folder from TOML config: {}", self.module_name, path.display());
            return path.clone();
        }

        let path = CompiledDefaults::for_current_platform().root_folder;
        info!("[{}] Root folder from compiled default: {}", self.module_name, path.display());
        path
    }
}

/// Creates the root folder on first start
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
        }
        std::fs::create_dir_all(&self.root_folder).map_err(|e| {
            Error::Config(format!(
                "Failed to create root folder {}: {}",
                self.root_folder.display(),
                e
            ))
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}
