//! Application configuration for dbtools.
//!
//! User config lives at `~/.dbtools/dbtools.toml`, or wherever the
//! `DBTOOLS_CONFIG` environment variable points.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DbToolsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dbtools.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dbtools";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "DBTOOLS_CONFIG";

// ---------------------------------------------------------------------------
// Config structs (matching dbtools.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Conversion defaults shared by every tool.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// CSV field separator.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Suffix timestamps with `Z` instead of `+0000`.
    #[serde(default)]
    pub tz: bool,

    /// Emit/interpret MongoDB extended JSON types (`$oid`, `$date`).
    #[serde(default = "default_true")]
    pub mongo_types: bool,

    /// Write MongoDB dumps as a JSON array instead of one document per line.
    #[serde(default)]
    pub array: bool,

    /// Write the comment header in SQL dumps.
    #[serde(default = "default_true")]
    pub comments: bool,

    /// Require input/output files to carry their format's extension.
    #[serde(default = "default_true")]
    pub check_extensions: bool,

    /// Database name for the `USE` statement in SQL dumps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Decimal places used when rendering numbers.
    #[serde(default = "default_number_precision")]
    pub number_precision: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            tz: false,
            mongo_types: true,
            array: false,
            comments: true,
            check_extensions: true,
            db: None,
            number_precision: default_number_precision(),
        }
    }
}

fn default_separator() -> String {
    ",".into()
}
fn default_true() -> bool {
    true
}
fn default_number_precision() -> usize {
    2
}

// ---------------------------------------------------------------------------
// Convert options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime conversion options: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// CSV field separator (must be a single byte when used).
    pub separator: String,
    /// Use `Z` rather than `+0000` as the timestamp zone suffix.
    pub tz: bool,
    /// MongoDB extended JSON types in and out.
    pub mongo_types: bool,
    /// JSON array output for MongoDB dumps.
    pub array: bool,
    /// Comment header in SQL dumps.
    pub comments: bool,
    /// Enforce file extensions.
    pub check_extensions: bool,
    /// `USE` database for SQL dumps.
    pub db: Option<String>,
    /// Table to select from (or name for) a SQL dump.
    pub table: Option<String>,
    /// Decimal places for numbers.
    pub number_precision: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ConvertOptions {
    fn from(config: &AppConfig) -> Self {
        let d = &config.defaults;
        Self {
            separator: d.separator.clone(),
            tz: d.tz,
            mongo_types: d.mongo_types,
            array: d.array,
            comments: d.comments,
            check_extensions: d.check_extensions,
            db: d.db.clone().filter(|db| !db.is_empty()),
            table: None,
            number_precision: d.number_precision,
        }
    }
}

impl ConvertOptions {
    /// The separator as a single byte, as required by the CSV codec.
    pub fn separator_byte(&self) -> Result<u8> {
        match self.separator.as_bytes() {
            [b] => Ok(*b),
            [] => Err(DbToolsError::config("separator must not be empty")),
            _ if self.separator == "\\t" => Ok(b'\t'),
            _ => Err(DbToolsError::config(format!(
                "separator '{}' must be a single byte",
                self.separator
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dbtools/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DbToolsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file, honouring `DBTOOLS_CONFIG`.
pub fn config_file_path() -> Result<PathBuf> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
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

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DbToolsError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DbToolsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| DbToolsError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DbToolsError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| DbToolsError::io(path, e))?;
    tracing::info!(?path, "created default config file");
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}
