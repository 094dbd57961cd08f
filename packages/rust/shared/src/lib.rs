//! Shared types, error model, and configuration for dbtools.
//!
//! This crate is the foundation depended on by all other dbtools crates.
//! It provides:
//! - [`DbToolsError`]: the unified error type
//! - Domain types ([`Format`], [`Tool`], [`Value`], [`Table`])
//! - Configuration ([`AppConfig`], [`ConvertOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_ENV_VAR, ConvertOptions, DefaultsConfig, config_dir, config_file_path,
    init_config, init_config_at, load_config, load_config_from,
};
pub use error::{DbToolsError, Result};
pub use types::{
    Format, Table, Tool, Value, format_number, mongo_timestamp, parse_timestamp, sql_timestamp,
};
