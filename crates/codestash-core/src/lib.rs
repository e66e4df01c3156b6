//! # codestash-core
//!
//! Core library for codestash providing:
//! - The typed configuration model (projects, backup profiles, search sets)
//! - JSON configuration loading with defaults and validation
//! - Closed identifier types for backup steps, output formats and separator styles

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{AppConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use types::{
    ArchiveFormat, BackupProfileConfig, BackupStep, ExcludeConfig, OutputConfig, OutputFormat,
    ProjectConfig, SearchSetConfig, SeparatorStyle,
};
