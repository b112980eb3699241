//! Storage infrastructure: the optional TOML defaults file.

pub mod config;

pub use config::{load_config_from, parse_config, ConfigError, FileConfig};
