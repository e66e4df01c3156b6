//! CLI command implementations

pub mod backup;
pub mod bundle;
pub mod config;
pub mod time;
pub mod version;

use anyhow::{Context, Result};
use camino::Utf8Path;
use codestash_core::AppConfig;

/// Load the configuration from `--config` or by searching upwards.
pub(crate) fn load_config(path: Option<&Utf8Path>) -> Result<AppConfig> {
    AppConfig::load(path.map(Utf8Path::as_std_path)).context("Failed to load configuration")
}
